use crate::Database;
use crate::models::{ProductRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

/// Insert arguments for a new user. `created_at` is filled by the DB.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: Option<&'a str>,
    pub street: Option<&'a str>,
    pub zip: Option<&'a str>,
    pub city: Option<&'a str>,
    pub country: Option<&'a str>,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, phone, street, zip, city, country)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password_hash,
                    user.phone,
                    user.street,
                    user.zip,
                    user.city,
                    user.country,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Access tokens --

    pub fn insert_token(&self, id: &str, user_id: &str, token_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO access_tokens (id, user_id, token_hash) VALUES (?1, ?2, ?3)",
                (id, user_id, token_hash),
            )?;
            Ok(())
        })
    }

    /// Resolve a token digest to its owning user in one joined query, so a
    /// concurrent revocation is either fully visible or not at all.
    pub fn get_user_by_token_hash(&self, token_hash: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.email, u.password, u.phone, u.street,
                        u.zip, u.city, u.country, u.created_at
                 FROM access_tokens t
                 JOIN users u ON u.id = t.user_id
                 WHERE t.token_hash = ?1",
            )?;
            let row = stmt.query_row([token_hash], user_from_row).optional()?;
            Ok(row)
        })
    }

    /// Delete every token for the user. Single statement — a concurrent
    /// resolve sees either all of the user's tokens or none of them.
    pub fn delete_tokens_for_user(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM access_tokens WHERE user_id = ?1", [user_id])?;
            Ok(n)
        })
    }

    // -- Products --

    pub fn insert_product(&self, product: &ProductRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO products (id, user_id, name, description, price, banner_image)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    product.id,
                    product.user_id,
                    product.name,
                    product.description,
                    product.price,
                    product.banner_image,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, price, banner_image, created_at
                 FROM products WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], product_from_row).optional()?;
            Ok(row)
        })
    }

    /// The user's products, most recently created first.
    pub fn list_products_for_user(&self, user_id: &str) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, price, banner_image, created_at
                 FROM products
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full-row update; the caller merges partial fields against the
    /// existing row before calling.
    pub fn update_product(
        &self,
        id: &str,
        name: &str,
        description: &str,
        price: f64,
        banner_image: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE products
                 SET name = ?2, description = ?3, price = ?4, banner_image = ?5
                 WHERE id = ?1",
                rusqlite::params![id, name, description, price, banner_image],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_product(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a compile-time constant, never user input.
    let sql = format!(
        "SELECT id, name, email, password, phone, street, zip, city, country, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        phone: row.get(4)?,
        street: row.get(5)?,
        zip: row.get(6)?,
        city: row.get(7)?,
        country: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        banner_image: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use uuid::Uuid;

    fn test_user<'a>(id: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            id,
            name: "Tester",
            email,
            password_hash: "$argon2id$fake",
            phone: None,
            street: None,
            zip: None,
            city: None,
            country: None,
        }
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&test_user("u1", "a@x.com")).unwrap();

        let err = db.create_user(&test_user("u2", "a@x.com")).unwrap_err();
        assert!(is_unique_violation(&err));

        // The first registration is still intact.
        let row = db.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(row.id, "u1");
    }

    #[test]
    fn token_resolve_and_revoke() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&test_user("u1", "a@x.com")).unwrap();

        db.insert_token("t1", "u1", "hash-one").unwrap();
        db.insert_token("t2", "u1", "hash-two").unwrap();

        let resolved = db.get_user_by_token_hash("hash-one").unwrap().unwrap();
        assert_eq!(resolved.email, "a@x.com");

        let revoked = db.delete_tokens_for_user("u1").unwrap();
        assert_eq!(revoked, 2);
        assert!(db.get_user_by_token_hash("hash-one").unwrap().is_none());
        assert!(db.get_user_by_token_hash("hash-two").unwrap().is_none());
    }

    #[test]
    fn products_list_newest_first_and_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&test_user("u1", "a@x.com")).unwrap();
        db.create_user(&test_user("u2", "b@x.com")).unwrap();

        for (n, owner) in [("first", "u1"), ("second", "u1"), ("other", "u2")] {
            db.insert_product(&ProductRow {
                id: Uuid::new_v4().to_string(),
                user_id: owner.into(),
                name: n.into(),
                description: "d".into(),
                price: 1.0,
                banner_image: None,
                created_at: String::new(),
            })
            .unwrap();
        }

        let mine = db.list_products_for_user("u1").unwrap();
        let names: Vec<_> = mine.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["second", "first"]);
    }

    #[test]
    fn update_and_delete_product() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&test_user("u1", "a@x.com")).unwrap();

        let id = Uuid::new_v4().to_string();
        db.insert_product(&ProductRow {
            id: id.clone(),
            user_id: "u1".into(),
            name: "widget".into(),
            description: "d".into(),
            price: 10.0,
            banner_image: Some("old.png".into()),
            created_at: String::new(),
        })
        .unwrap();

        assert!(db.update_product(&id, "widget", "d", 12.5, Some("new.png")).unwrap());
        let row = db.get_product(&id).unwrap().unwrap();
        assert_eq!(row.price, 12.5);
        assert_eq!(row.banner_image.as_deref(), Some("new.png"));

        assert!(db.delete_product(&id).unwrap());
        assert!(!db.delete_product(&id).unwrap());
        assert!(db.get_product(&id).unwrap().is_none());
    }
}
