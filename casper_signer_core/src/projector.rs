// Display projection of a queued deploy

use crate::deploy::{CLValue, Deploy, NamedArg};
use crate::error::{SignerError, SignerResult};
use crate::models::{DeployType, DisplaySummary, SigningRequest};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Build the read-only summary the approval surface renders.
pub fn project(request: &SigningRequest) -> SignerResult<DisplaySummary> {
    let deploy = request.deploy().ok_or(SignerError::MissingPayload)?;
    let header = &deploy.header;

    Ok(DisplaySummary {
        deploy_hash: deploy.hash.clone(),
        signing_key: request.signing_key().to_string(),
        account: header.account.to_account_hex(),
        chain_name: header.chain_name.clone(),
        timestamp: format_timestamp(&header.timestamp),
        gas_price: header.gas_price,
        payment: payment_amount(deploy),
        deploy_type: deploy_type(deploy),
        deploy_args: render_args(deploy.session.args()),
    })
}

pub fn deploy_type(deploy: &Deploy) -> DeployType {
    if deploy.is_transfer() {
        DeployType::Transfer
    } else {
        DeployType::Contract
    }
}

/// en-US style: `5/4/2021, 3:30:05 PM`
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Motes in decimal. Bytes that do not decode as a U512 are shown as hex.
fn payment_amount(deploy: &Deploy) -> String {
    match deploy.payment.arg("amount") {
        Some(value) => value
            .to_u512_decimal()
            .unwrap_or_else(|_| value.bytes.clone()),
        None => "0".to_string(),
    }
}

fn render_args(args: &[NamedArg]) -> BTreeMap<String, String> {
    args.iter()
        .map(|NamedArg(name, value)| (name.clone(), render_value(value)))
        .collect()
}

fn render_value(value: &CLValue) -> String {
    match &value.parsed {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => value.bytes.clone(),
    }
}
