use tracing::{error, info, warn};

use tracing_jsonlog::init::{init_logging, LoggingConfig};

#[derive(Debug)]
struct PaymentDeclined;

impl std::fmt::Display for PaymentDeclined {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("card issuer declined the charge")
    }
}

impl std::error::Error for PaymentDeclined {}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::from_env()?)?;

    info!("starting service");

    warn!(
        user_id = 42,
        authorization = "Bearer abc.def.ghi",
        "authentication retried"
    );

    info!("{}", r#"{"event":"checkout","items":3,"session":{"token":"s3cr3t"}}"#);

    let err = PaymentDeclined;
    error!(error = &err as &(dyn std::error::Error + 'static), order_id = 1001, "charge failed");

    Ok(())
}
