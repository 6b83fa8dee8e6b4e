use std::io::Read;

use objlink_wire::{kind_name, Message};
use serde::Serialize;
use serde_json::Value;

use crate::cmd::DecodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct DecodeOutput<'a> {
    kind: &'a str,
    message: Value,
}

fn json_line(kind: &str, message: Value) -> String {
    let out = DecodeOutput { kind, message };
    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let text = if args.message == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| CliError::new(INTERNAL, format!("stdin read failed: {err}")))?;
        buffer
    } else {
        args.message
    };

    let message = Message::decode(text.trim())
        .map_err(|err| CliError::new(DATA_INVALID, format!("decode failed: {err}")))?;
    let canonical = message
        .encode()
        .map_err(|err| CliError::new(INTERNAL, format!("re-encode failed: {err}")))?;

    match format {
        OutputFormat::Json => {
            let value: Value = serde_json::from_str(&canonical)
                .map_err(|err| CliError::new(INTERNAL, format!("re-encode failed: {err}")))?;
            println!("{}", json_line(kind_name(message.kind()), value));
        }
        OutputFormat::Pretty => {
            println!("kind: {}", kind_name(message.kind()));
            println!("message: {canonical}");
        }
    }

    Ok(SUCCESS)
}
