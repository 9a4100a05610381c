//! JSON output for replicated forms
//!
//! One JSON object per line on stdout: `{"digest": ..., "form": ...}`.

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::CliResult;
use crate::replication::Digest;

/// Write one replicated form as a JSON line to stdout
pub fn write_form(digest: &Digest, form: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write_form_to(&mut stdout, digest, form)
}

fn write_form_to<W: Write>(writer: &mut W, digest: &Digest, form: &Value) -> CliResult<()> {
    let record = json!({
        "digest": digest,
        "form": form,
    });
    serde_json::to_writer(&mut *writer, &record)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
