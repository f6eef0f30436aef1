pub mod d0010_file;

pub use d0010_file::D0010FileSource;

/// Item produced by a source together with its 1-based line number in the
/// input file.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub line: u64,
}
