mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use learn_to_work::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
