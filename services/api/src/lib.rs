mod cli;
mod infra;
mod report;
mod routes;
mod server;

use tenant_arrears::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
