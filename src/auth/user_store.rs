//! User Storage
//! Mission: Store and verify operator accounts with SQLite

use crate::auth::models::User;
use crate::settings::{generate_password, PASSWORD_FILE};
use anyhow::{Context, Result};
use bcrypt::{hash, verify};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// User storage with SQLite backend
pub struct UserStore {
    db_path: PathBuf,
    bcrypt_cost: u32,
}

impl UserStore {
    /// Create a new user store and initialize the schema.
    pub fn new(db_path: impl Into<PathBuf>, bcrypt_cost: u32) -> Result<Self> {
        let store = Self {
            db_path: db_path.into(),
            bcrypt_cost,
        };
        store.init_db()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path).context("Failed to open user database")
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Create the bootstrap admin account on first start.
    ///
    /// Uses `admin_password` when the operator supplied one, otherwise
    /// generates one. Either way the password is written exactly once to
    /// `initial-admin-password` inside `data_dir` for operator retrieval.
    /// A store that already has an admin account is left untouched.
    pub fn bootstrap_admin(&self, data_dir: &Path, admin_password: Option<&str>) -> Result<()> {
        let conn = self.open()?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users WHERE is_admin = 1", [], |row| {
                row.get(0)
            })
            .context("Failed to check for admin accounts")?;

        if count > 0 {
            return Ok(());
        }

        let password = match admin_password {
            Some(p) => p.to_string(),
            None => {
                info!("Admin password not set, generating...");
                generate_password(32)
            }
        };

        self.create_user("admin", &password, true)?;

        let path = data_dir.join(PASSWORD_FILE);
        fs::write(&path, &password)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Cannot restrict {}", path.display()))?;
        }

        info!(
            "🔐 Initial login is username: admin, password file: {}",
            path.display()
        );
        Ok(())
    }

    /// Get user by username, including the password hash.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, is_admin
             FROM users WHERE username = ?1",
        )?;

        let user_result = stmt.query_row(params![username], |row| {
            Ok(User {
                user_id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                is_admin: row.get::<_, i64>(3)? != 0,
            })
        });

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by id.
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, is_admin
             FROM users WHERE id = ?1",
        )?;

        let user_result = stmt.query_row(params![user_id], |row| {
            Ok(User {
                user_id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                is_admin: row.get::<_, i64>(3)? != 0,
            })
        });

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check a username/password pair against the store.
    ///
    /// One read, no side effects. Unknown usernames and wrong passwords are
    /// indistinguishable to the caller: both come back as `None`.
    pub fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<(i64, bool)>> {
        let Some(user) = self.get_user_by_username(username)? else {
            return Ok(None);
        };

        let valid =
            verify(password, &user.password_hash).context("Failed to verify password")?;
        if valid {
            Ok(Some((user.user_id, user.is_admin)))
        } else {
            Ok(None)
        }
    }

    /// Create a new user. The username must be unique.
    pub fn create_user(&self, username: &str, password: &str, is_admin: bool) -> Result<User> {
        let password_hash =
            hash(password, self.bcrypt_cost).context("Failed to hash password")?;

        let conn = self.open()?;
        conn.execute(
            "INSERT INTO users (username, password_hash, is_admin) VALUES (?1, ?2, ?3)",
            params![username, password_hash, is_admin as i64],
        )
        .context("Failed to insert user")?;

        let user = User {
            user_id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash,
            is_admin,
        };

        info!("✅ Created user: {} (admin: {})", user.username, is_admin);
        Ok(user)
    }

    /// List all users, admins first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, is_admin
             FROM users ORDER BY is_admin DESC, id",
        )?;

        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    is_admin: row.get::<_, i64>(3)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Change a user's password after checking the old one.
    ///
    /// Returns false when the user does not exist or the old password does
    /// not match; the caller cannot tell which.
    pub fn update_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool> {
        let conn = self.open()?;

        let hash_result = conn.query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get::<_, String>(0),
        );

        let stored_hash = match hash_result {
            Ok(h) => h,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if !verify(old_password, &stored_hash).context("Failed to verify password")? {
            return Ok(false);
        }

        let new_hash =
            hash(new_password, self.bcrypt_cost).context("Failed to hash password")?;
        let rows = conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![new_hash, user_id],
        )?;

        Ok(rows == 1)
    }

    /// Toggle the admin flag. Already-issued tokens keep the role they were
    /// issued with; the change applies at the user's next login.
    pub fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<bool> {
        let conn = self.open()?;

        let rows = conn.execute(
            "UPDATE users SET is_admin = ?1 WHERE id = ?2",
            params![is_admin as i64, user_id],
        )?;

        Ok(rows == 1)
    }

    /// Delete a user by id.
    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        let conn = self.open()?;

        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if rows == 1 {
            info!("🗑️  Deleted user: {}", user_id);
        }

        Ok(rows == 1)
    }
}
