use std::{path::PathBuf, pin::Pin};

use async_stream::try_stream;
use futures::Stream;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use super::Envelope;
use crate::{
    error::ImportError,
    record::{classify, D0010Line, FIELD_DELIMITER},
};

/// Pipe-delimited D0010 flow file.
///
/// There is no header row and line lengths vary by record type. `|` is the
/// only structural character; there is no quoting.
pub struct D0010FileSource {
    path: PathBuf,
}

impl D0010FileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Streams classified lines in file order, numbered by physical line.
    /// Empty lines are counted but not yielded. Errors (open failure, I/O
    /// failure mid-file, invalid UTF-8) end the stream.
    pub fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<D0010Line>, ImportError>> + Send>> {
        let path = self.path.clone();
        let s = try_stream! {
            let file = File::open(&path).await.map_err(|e| {
                ImportError::Source(format!("failed to open D0010 file {}: {e}", path.display()))
            })?;
            let mut lines = BufReader::new(file).lines();
            let mut line: u64 = 0;

            while let Some(text) = lines.next_line().await.map_err(|e| {
                ImportError::Source(format!(
                    "failed to read D0010 line {} in {}: {e}",
                    line + 1,
                    path.display()
                ))
            })? {
                line += 1;
                if text.is_empty() {
                    continue;
                }

                let fields: Vec<&str> = text.split(FIELD_DELIMITER).collect();
                let payload = classify(&fields);

                yield Envelope { payload, line };
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;

    #[tokio::test]
    async fn streams_lines_in_order_with_line_numbers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "ZHV|0000475656|D0010002|D|\n026|1200023305967|V|\n\n028| F75A\t00802 |\n"
        )
        .unwrap();

        let items: Vec<_> = D0010FileSource::new(file.path()).stream().collect().await;
        let items: Vec<_> = items.into_iter().map(Result::unwrap).collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].payload, D0010Line::Unrecognized("ZHV".to_string()));
        assert_eq!(items[0].line, 1);
        assert_eq!(items[1].payload, D0010Line::MeterPoint("1200023305967".to_string()));
        assert_eq!(items[1].line, 2);
        assert_eq!(items[2].payload, D0010Line::Serial("F75A00802".to_string()));
        assert_eq!(items[2].line, 4);
    }

    #[tokio::test]
    async fn line_numbers_count_every_blank_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\n\n026|1|V|\r\n\r\n\n028|S1|\r\n").unwrap();

        let items: Vec<_> = D0010FileSource::new(file.path()).stream().collect().await;
        let items: Vec<_> = items.into_iter().map(Result::unwrap).collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].payload, D0010Line::MeterPoint("1".to_string()));
        assert_eq!(items[0].line, 3);
        assert_eq!(items[1].payload, D0010Line::Serial("S1".to_string()));
        assert_eq!(items[1].line, 6);
    }

    #[tokio::test]
    async fn quotes_are_plain_characters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "028|\"AB 12\"|\n").unwrap();

        let items: Vec<_> = D0010FileSource::new(file.path()).stream().collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap().payload,
            D0010Line::Serial("\"AB12\"".to_string())
        );
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let items: Vec<_> = D0010FileSource::new("does/not/exist.uff").stream().collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ImportError::Source(_))));
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_source_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"026|1200023305967|V|\n028|\xff\xfe|\n").unwrap();

        let items: Vec<_> = D0010FileSource::new(file.path()).stream().collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ImportError::Source(_))));
    }
}
