use std::process::ExitCode;

use bytes::Bytes;
use clap::{Arg, ArgAction, Command};
use tokio::{
  io::AsyncReadExt,
  sync::mpsc::{self, Sender},
};
use url::Url;

use packmsg::{Constant, Message, RandomIds, Result, Transaction};
use sink::{MessageSink, SinkOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
  Record,
  Compact,
  Pack,
}

#[tokio::main]
async fn main() -> ExitCode {
  env_logger::init();

  let mut cmd = Command::new("packmsg")
    .version("0.1")
    .about("Reshapes newline delimited transactions into downstream messages")
    .arg(Arg::new("input").required(true).help("transaction file, or - for stdin"))
    .arg(
      Arg::new("format")
        .short('f')
        .long("format")
        .value_parser(["record", "compact", "pack"])
        .default_value("record"),
    )
    .arg(
      Arg::new("mask")
        .short('m')
        .long("mask")
        .action(ArgAction::Append)
        .value_parser(str::parse::<Constant>)
        .help("replace a column with a constant, as column=value"),
    )
    .arg(
      Arg::new("sink")
        .short('s')
        .long("sink")
        .value_parser(Url::parse)
        .default_value("stdout:"),
    );

  let mut matches = cmd.get_matches_mut();

  let input = matches.remove_one::<String>("input").unwrap_or_else(|| "-".to_string());
  let format = match matches.remove_one::<String>("format").as_deref() {
    Some("compact") => Format::Compact,
    Some("pack") => Format::Pack,
    _ => Format::Record,
  };
  let masks: Vec<Constant> = matches
    .remove_many::<Constant>("mask")
    .map(Iterator::collect)
    .unwrap_or_else(Vec::new);
  let sink_options = match matches.remove_one::<Url>("sink").map(|url| SinkOptions::try_from(&url)) {
    Some(Ok(options)) => options,
    Some(Err(err)) => {
      log::error!("invalid sink: {}", err);
      return ExitCode::FAILURE;
    }
    None => SinkOptions::default(),
  };

  let (sender, receiver) = mpsc::channel(1024);
  let (_sink, handle) = MessageSink::spawn(sink_options, receiver);

  let outcome = run(&input, format, &masks, sender).await;

  let written = match handle.await {
    Ok(Ok(written)) => written,
    Ok(Err(err)) => {
      log::error!("sink failed: {}", err);
      return ExitCode::FAILURE;
    }
    Err(err) => {
      log::error!("sink task failed: {}", err);
      return ExitCode::FAILURE;
    }
  };

  match outcome {
    Ok(transactions) => {
      log::info!("reshaped {} transactions into {} messages", transactions, written);
      ExitCode::SUCCESS
    }
    Err(err) => {
      log::error!("{}", err);
      ExitCode::FAILURE
    }
  }
}

async fn run(input: &str, format: Format, masks: &[Constant], sender: Sender<Bytes>) -> Result<usize> {
  let content = if input == "-" {
    let mut content = String::new();
    tokio::io::stdin().read_to_string(&mut content).await?;
    content
  } else {
    tokio::fs::read_to_string(input).await?
  };

  let mut ids = RandomIds;
  let mut transactions = 0;
  for line in content.lines().filter(|line| !line.trim().is_empty()) {
    let mut transaction: Transaction = serde_json::from_str(line)?;
    transaction.index_rows()?;
    for mask in masks {
      transaction.transform(mask)?;
    }
    transaction.fill_primary_keys();

    let payloads = match format {
      Format::Record => transaction
        .to_record_messages()?
        .iter()
        .map(Message::bytes)
        .collect::<Result<Vec<_>>>()?,
      Format::Compact => transaction
        .to_compact_messages(&mut ids)?
        .iter()
        .map(Message::bytes)
        .collect::<Result<Vec<_>>>()?,
      Format::Pack => vec![transaction.bytes()?],
    };

    log::debug!("{} produced {} messages", transaction.xid(), payloads.len());
    for payload in payloads {
      if sender.send(payload).await.is_err() {
        // the sink is gone; its own error is reported by main
        return Ok(transactions);
      }
    }
    transactions += 1;
  }
  Ok(transactions)
}
