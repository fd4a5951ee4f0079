//! Whole-document rewrite entry points.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::DocumentResult;
use crate::rewriter::PropertyRewriter;
use crate::xml::{XmlEventSource, XmlSink};

/// Result of rewriting a document file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Rewritten document, next to the input
    Rewritten(PathBuf),
    /// Input was not well formed; nothing was written
    Rejected(String),
}

/// Stream `input` through the rewriter into `output`.
pub fn rewrite_document<R: BufRead, W: Write>(input: R, output: W, root: &str) -> DocumentResult<W> {
    let mut sink = XmlSink::new(output);
    let mut rewriter = PropertyRewriter::new(root);

    for event in XmlEventSource::new(input) {
        rewriter.feed(event?, &mut sink)?;
    }
    rewriter.finish(&mut sink)?;

    Ok(sink.into_inner())
}

pub fn rewrite_str(input: &str, root: &str) -> DocumentResult<String> {
    let bytes = rewrite_document(input.as_bytes(), Vec::new(), root)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Rewrite the document at `path` into a temporary file in the same folder.
///
/// The temporary file is kept only on success. A malformed input yields
/// [`RewriteOutcome::Rejected`]; I/O failures are returned as errors.
pub fn filter_document(path: impl AsRef<Path>, root: &str) -> DocumentResult<RewriteOutcome> {
    let path = path.as_ref();
    let input = BufReader::new(File::open(path)?);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = tempfile::Builder::new()
        .prefix("proxycache-")
        .suffix(".mlt")
        .tempfile_in(dir)?;

    let written = {
        let mut output = BufWriter::new(temp.as_file());
        rewrite_document(input, &mut output, root).and_then(|w| Ok(w.flush()?))
    };

    match written {
        Ok(()) => {
            let (_, kept) = temp.keep().map_err(|e| e.error)?;
            info!(input = %path.display(), output = %kept.display(), "Rewrote project document");
            Ok(RewriteOutcome::Rewritten(kept))
        }
        Err(e) if e.is_parse_error() => {
            warn!(input = %path.display(), error = %e, "Rejected malformed project document");
            Ok(RewriteOutcome::Rejected(e.to_string()))
        }
        Err(e) => Err(e),
    }
}
