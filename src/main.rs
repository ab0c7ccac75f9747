use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};

use irhvac::{
    common::{CommonState, Protocol},
    irac,
    recording::{self, Format, Recording},
    smartir,
};

#[derive(Parser, Debug)]
#[command(name = "irhvac", about = "Encode and decode A/C infrared remote commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read recordings from stdin (one per line) and print decoded states as JSON
    Decode {
        /// Input representation
        #[arg(long, value_enum, default_value_t = Format::Hex)]
        format: Format,

        /// Only try this protocol instead of auto-detection
        #[arg(long)]
        protocol: Option<Protocol>,

        /// Accept frames with bad integrity fields
        #[arg(long)]
        no_strict: bool,
    },

    /// Read JSON states from stdin (one per line) and print encoded recordings
    Encode {
        /// Output representation
        #[arg(long, value_enum, default_value_t = Format::Hex)]
        format: Format,
    },

    /// Print a SmartIR code file covering every state of one protocol
    Smartir {
        #[arg(long)]
        protocol: Protocol,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Decode {
            format,
            protocol,
            no_strict,
        } => decode(format, protocol, !no_strict),
        Command::Encode { format } => encode(format),
        Command::Smartir { protocol } => {
            let file = smartir::gen_smartir(protocol)?;
            println!("{}", serde_json::to_string_pretty(&file)?);
            Ok(())
        }
    }
}

fn decode(format: Format, protocol: Option<Protocol>, strict: bool) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut prev: Option<CommonState> = None;

    for line in stdin.lock().lines() {
        let recording = recording::parse(format, &line?)?;
        let samples = recording.to_pulses();

        let state = match protocol {
            Some(p) => irac::decode_protocol(p, &samples, strict)?,
            None => irac::detect(&samples, strict)?,
        };

        let common = state.to_common(prev.as_ref());
        println!("{}", serde_json::to_string(&common)?);
        io::stdout().flush()?;
        prev = Some(common);
    }

    Ok(())
}

fn encode(format: Format) -> anyhow::Result<()> {
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let state: CommonState = serde_json::from_str(&line?)?;
        let pulses = irac::encode(&state, irac::default_repeat(state.protocol));
        let recording = Recording::from_pulses(&pulses);
        println!("{}", recording::serialize(format, &recording));
        io::stdout().flush()?;
    }

    Ok(())
}
