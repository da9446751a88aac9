use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDateTime;

wire_enum! {
    UserRole {
        User => "user",
        Admin => "admin",
    }
}

/// Публичные данные пользователя.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

// Строка таблицы users вместе с хешем пароля. Наружу не отдаётся.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

impl UserRecord {
    // Найти пользователя по имени
    pub async fn find_by_username(username: &str, db: &crate::database::Database) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, password_hash, role, created_at FROM users WHERE username = $1"
        )
        .bind(username)
        .fetch_optional(&db.pool)
        .await
    }

    // Занято ли имя или email
    pub async fn exists(username: &str, email: &str, db: &crate::database::Database) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)"
        )
        .bind(username)
        .bind(email)
        .fetch_one(&db.pool)
        .await
    }

    // Создать пользователя с ролью user, вернуть id
    pub async fn create<'e, E>(username: &str, email: &str, password_hash: &str, executor: E) -> Result<i64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, 'user') RETURNING id"
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(executor)
        .await
    }

    // Проверить пароль по bcrypt-хешу
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::User)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role(),
        }
    }
}
