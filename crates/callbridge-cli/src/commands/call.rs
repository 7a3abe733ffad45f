//! `callbridge call`: one calculation through the hosting bridge

use super::BridgeArgs;
use crate::GlobalOpts;
use callbridge_host::Bridge;
use callbridge_logger as logger;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct CallCommand {
    /// First operand
    #[arg(default_value_t = 1, allow_negative_numbers = true)]
    pub a: i32,

    /// Second operand
    #[arg(default_value_t = 1, allow_negative_numbers = true)]
    pub b: i32,

    #[command(flatten)]
    pub bridge: BridgeArgs,
}

pub fn handle_call(cmd: CallCommand, _opts: &GlobalOpts) -> anyhow::Result<()> {
    let settings = cmd.bridge.resolve()?;
    logger::debug(&format!(
        "Calling {}::{} via the {} protocol",
        settings.type_name, settings.method, settings.protocol
    ));

    let callable = Bridge::get(&settings)?;
    let result = callable.invoke(cmd.a, cmd.b)?;
    println!("{}", result_line(result));
    Ok(())
}

pub(crate) fn result_line(result: i32) -> String {
    format!("Calculation result is {}", result)
}
