use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub fn mint(email: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    let token = generate_jwt(Claims::new(email.clone()))?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Token issued for {}", email),
            Some(json!({ "email": email, "token": token })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
