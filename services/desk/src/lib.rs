mod cli;
mod console;
mod render;

use permit_desk::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
