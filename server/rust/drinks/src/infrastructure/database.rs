use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

/// DatabaseConfig はデータベース接続の設定を表す。
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default = "default_password")]
    pub password: SecretString,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,
    /// 起動時に全行を削除して初期データを投入する（開発用）
    #[serde(default)]
    pub reset_on_startup: bool,
}

fn default_db_port() -> u16 {
    5432
}

fn default_password() -> SecretString {
    SecretString::new(String::new())
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_max_open_conns() -> u32 {
    25
}

impl DatabaseConfig {
    /// PostgreSQL の接続オプションを組み立てる。
    /// URL を経由しないので、パスワードやユーザー名に `@` や `/` を含んでもよい。
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        let ssl_mode: PgSslMode = self.ssl_mode.parse()?;
        Ok(PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(&self.name)
            .ssl_mode(ssl_mode))
    }
}

/// 接続プールを作成する。
pub async fn create_pool(options: PgConnectOptions, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// 埋め込みマイグレーションを適用する。
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// drinks テーブルを空にし、初期ドリンクを 1 件投入する。
pub async fn reset_and_seed(pool: &PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("TRUNCATE TABLE drinks RESTART IDENTITY")
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
        .bind("water")
        .bind(serde_json::json!([{"name": "water", "color": "blue", "parts": 1}]))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
