use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use tokio::{
  fs::OpenOptions,
  io::{AsyncWrite, AsyncWriteExt, BufWriter},
  sync::mpsc,
  task::JoinHandle,
};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
  Stdout,
  File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOptions {
  pub target: SinkTarget,
  // only meaningful for files
  pub append: bool,
}

impl Default for SinkOptions {
  fn default() -> Self {
    Self {
      target: SinkTarget::Stdout,
      append: false,
    }
  }
}

impl TryFrom<&Url> for SinkOptions {
  type Error = io::Error;

  fn try_from(url: &Url) -> Result<Self, Self::Error> {
    let query_pairs = url.query_pairs().collect::<BTreeMap<_, _>>();
    let append = query_pairs
      .get("append")
      .and_then(|v| v.parse().ok())
      .unwrap_or(false);

    let target = match url.scheme() {
      "stdout" => SinkTarget::Stdout,
      "file" => url
        .to_file_path()
        .map(SinkTarget::File)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not a file path", url)))?,
      scheme => {
        return Err(io::Error::new(
          io::ErrorKind::InvalidInput,
          format!("unsupported sink scheme {}", scheme),
        ))
      }
    };

    Ok(Self { target, append })
  }
}

/// Writes every payload it receives, newline delimited, until the sending side hangs up.
#[derive(Debug)]
pub struct MessageSink;

impl MessageSink {
  /// The task resolves to the number of payloads written.
  pub fn spawn(options: SinkOptions, mut receiver: mpsc::Receiver<Bytes>) -> (Self, JoinHandle<io::Result<u64>>) {
    let handle = tokio::task::spawn(async move {
      let mut writer = BufWriter::new(open(&options).await?);
      let mut written: u64 = 0;
      while let Some(payload) = receiver.recv().await {
        writer.write_all(&payload).await?;
        writer.write_all(b"\n").await?;
        written += 1;
      }
      writer.flush().await?;
      log::debug!("sink closed after {} payloads", written);
      Ok::<_, io::Error>(written)
    });
    (Self, handle)
  }
}

async fn open(options: &SinkOptions) -> io::Result<Box<dyn AsyncWrite + Send + Unpin>> {
  match &options.target {
    SinkTarget::Stdout => Ok(Box::new(tokio::io::stdout())),
    SinkTarget::File(path) => {
      let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(options.append)
        .truncate(!options.append)
        .open(path)
        .await?;
      Ok(Box::new(file))
    }
  }
}
