// Shared between the auth and tasks suites; not every binary uses every helper.
#![allow(dead_code)]

use sqlx::PgPool;
use taskvault::Config;
use uuid::Uuid;

/// Connects to the test database named by `DATABASE_URL` and applies
/// migrations. Returns `None` (so the caller can skip) when the variable is
/// unset, which keeps the suite green on machines without Postgres.
pub async fn try_pool() -> Option<PgPool> {
    dotenv::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping integration test");
            return None;
        }
    };
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test DB");
    Some(pool)
}

/// Config for in-process test apps; the secret is fixed so tokens minted in
/// one request validate in the next.
pub fn test_config() -> Config {
    Config {
        database_url: std::env::var("DATABASE_URL").unwrap_or_default(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "integration-test-secret".to_string(),
    }
}

/// A fresh email per test run, so suites never collide on the unique index.
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4())
}

/// Builds a singlepart `multipart/form-data` body carrying one `avatar` file
/// field, for driving the upload endpoint through `actix_web::test`.
pub fn multipart_avatar(boundary: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"avatar\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// A small PNG of the given dimensions, for avatar upload tests.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
