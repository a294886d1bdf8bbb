//! Delimited text reader.
//!
//! A scan range owns every line that *starts* inside `[offset, end)`. A range
//! that does not begin at the start of the file skips the partial line it
//! lands in, and the last owned line is finished by reading past `end`.
//! Adjacent ranges therefore emit every line of the file exactly once.
//!
//! The owned lines are decoded by Arrow's CSV reader into string columns and
//! then cast to the slot types.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::cast;
use arrow::csv::reader::{Format, ReaderBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use bytes::Bytes;
use regex::Regex;
use splitscan_result::{Error, Result};
use splitscan_types::{Compression, Literal};

use super::{Scanner, ScannerKind};
use crate::context::ScannerContext;
use crate::partition::TextFormat;
use crate::stream::ScanStream;

/// Read size used to finish a line that runs past the range end.
const TAIL_READ_SIZE: usize = 64 * 1024;

/// Matches Hive's NULL marker (`\N`) and nothing else.
const NULL_MARKER_PATTERN: &str = r"^\\N$";

/// Quote byte for unquoted partitions. Arrow's reader always honours a quote
/// at field start, and Hive text never starts a field with NUL.
const NO_QUOTE: u8 = 0;

#[derive(Debug, Clone)]
enum ColumnSource {
    /// Constant partition-key value.
    PartitionKey(Literal),
    /// Zero-based field index within a line.
    File(usize),
}

#[derive(Debug, Default)]
pub struct TextScanner {
    schema: Option<SchemaRef>,
    /// Utf8 schema of the fields on a line, as handed to the CSV reader.
    file_schema: Option<SchemaRef>,
    csv_format: Format,
    columns: Vec<ColumnSource>,
    line_delimiter: u8,
}

impl TextScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output schema, available once prepared.
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }
}

impl Scanner for TextScanner {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Text
    }

    fn prepare(&mut self, ctx: &mut ScannerContext) -> Result<()> {
        let desc = ctx.stream().file_desc();
        if desc.compression != Compression::None {
            return Err(Error::ScannerPrepareFailure(format!(
                "text scanner cannot decompress {} file {}",
                desc.compression, desc.file_name
            )));
        }

        let partition = ctx.partition();
        let num_keys = partition.num_partition_keys();
        let mut fields = Vec::new();
        let mut columns = Vec::new();
        for slot in ctx.tuple_desc().materialized_slots() {
            let source = if slot.is_partition_key(num_keys) {
                let literal = partition.partition_key_exprs()[slot.col_pos()].evaluate_literal()?;
                ColumnSource::PartitionKey(literal)
            } else {
                ColumnSource::File(slot.col_pos() - num_keys)
            };
            fields.push(Field::new(
                format!("slot_{}", slot.id()),
                slot.data_type().clone(),
                true,
            ));
            columns.push(source);
        }

        let text_format = partition.text_format();
        let widest = columns
            .iter()
            .filter_map(|column| match column {
                ColumnSource::File(idx) => Some(idx + 1),
                ColumnSource::PartitionKey(_) => None,
            })
            .max()
            .unwrap_or(1);
        let width = text_format.num_columns.unwrap_or(0).max(widest);

        self.schema = Some(Arc::new(Schema::new(fields)));
        self.file_schema = Some(file_schema(width));
        self.csv_format = csv_format(&text_format)?;
        self.columns = columns;
        self.line_delimiter = text_format.line_delimiter;
        Ok(())
    }

    fn process(&mut self, ctx: &mut ScannerContext) -> Result<()> {
        let (Some(schema), Some(file_schema)) = (self.schema.clone(), self.file_schema.clone())
        else {
            return Err(Error::Internal("text scanner processed before prepare".into()));
        };
        let Some(region) = read_owned_lines(ctx, self.line_delimiter)? else {
            return Ok(());
        };

        let range = ctx.scan_range().to_string();
        let reader = ReaderBuilder::new(file_schema)
            .with_format(self.csv_format.clone())
            .with_batch_size(ctx.batch_size())
            .build(&region[..])?;
        for file_rows in reader {
            let file_rows = file_rows.map_err(|err| {
                Error::ScannerProcessFailure(format!("malformed text in scan range {range}: {err}"))
            })?;
            ctx.emit_batch(self.assemble(&schema, &file_rows)?)?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.schema = None;
        self.file_schema = None;
        self.columns.clear();
    }
}

impl TextScanner {
    /// Project decoded file fields onto the slot layout and attach the
    /// partition-key columns.
    fn assemble(&self, schema: &SchemaRef, file_rows: &RecordBatch) -> Result<RecordBatch> {
        let rows = file_rows.num_rows();
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());
        for (column, field) in self.columns.iter().zip(schema.fields()) {
            let array = match column {
                ColumnSource::PartitionKey(literal) => {
                    literal.to_repeated_array(field.data_type(), rows)?
                }
                ColumnSource::File(idx) => {
                    let strings = file_rows.column(*idx);
                    match field.data_type() {
                        DataType::Utf8 => Arc::clone(strings),
                        target => cast(strings, target)?,
                    }
                }
            };
            arrays.push(array);
        }
        let options = RecordBatchOptions::new().with_row_count(Some(rows));
        Ok(RecordBatch::try_new_with_options(
            Arc::clone(schema),
            arrays,
            &options,
        )?)
    }
}

fn file_schema(width: usize) -> SchemaRef {
    let fields: Vec<Field> = (0..width)
        .map(|idx| Field::new(format!("c{idx}"), DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(fields))
}

fn csv_format(text_format: &TextFormat) -> Result<Format> {
    let null_regex = Regex::new(NULL_MARKER_PATTERN)
        .map_err(|err| Error::Internal(format!("invalid NULL marker pattern: {err}")))?;
    let quote = if text_format.quoted_fields {
        b'"'
    } else {
        NO_QUOTE
    };
    Ok(Format::default()
        .with_header(false)
        .with_delimiter(text_format.field_delimiter)
        .with_terminator(text_format.line_delimiter)
        .with_quote(quote)
        .with_null_regex(null_regex)
        .with_truncated_rows(true))
}

/// Bytes of every line the scan range owns, delimiters included. `None`
/// when no line starts inside the range.
fn read_owned_lines(ctx: &mut ScannerContext, delim: u8) -> Result<Option<Bytes>> {
    let offset = ctx.scan_range().offset();
    let end = ctx.scan_range().end();
    if end <= offset {
        return Ok(None);
    }

    // Start one byte early so a line beginning exactly at `offset` is
    // recognised by the delimiter preceding it.
    let read_start = offset.saturating_sub(1);
    let len = usize::try_from(end - read_start).map_err(|_| {
        Error::InvalidArgumentError(format!("scan range of {} bytes is too large", end - read_start))
    })?;
    let buf = ctx.stream_mut().read_at(read_start, len)?;
    let buf_end = read_start + buf.len() as u64;

    let first = if offset == 0 {
        0
    } else {
        match buf.iter().position(|b| *b == delim) {
            Some(i) => i + 1,
            None => return Ok(None),
        }
    };
    if read_start + first as u64 >= end.min(buf_end) {
        return Ok(None);
    }

    // The last owned line ends at the first delimiter at or after `end - 1`.
    let last_start = (end - 1 - read_start) as usize;
    let closing = buf
        .get(last_start..)
        .and_then(|tail| tail.iter().position(|b| *b == delim));
    match closing {
        Some(i) => Ok(Some(buf.slice(first..=last_start + i))),
        None if buf_end < end => Ok(Some(buf.slice(first..))),
        None => {
            let mut region = buf[first..].to_vec();
            read_tail(ctx.stream_mut(), buf_end, delim, &mut region)?;
            Ok(Some(Bytes::from(region)))
        }
    }
}

/// Finish a line whose delimiter lies past the buffered range, appending to
/// `region` up to and including the delimiter (or EOF).
fn read_tail(
    stream: &mut dyn ScanStream,
    mut pos: u64,
    delim: u8,
    region: &mut Vec<u8>,
) -> Result<()> {
    loop {
        let chunk = stream.read_at(pos, TAIL_READ_SIZE)?;
        if chunk.is_empty() {
            return Ok(());
        }
        if let Some(i) = chunk.iter().position(|b| *b == delim) {
            region.extend_from_slice(&chunk[..=i]);
            return Ok(());
        }
        region.extend_from_slice(&chunk);
        pos += chunk.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, StringArray};

    use super::*;

    fn decode(text: &str, width: usize, format: TextFormat) -> Vec<RecordBatch> {
        ReaderBuilder::new(file_schema(width))
            .with_format(csv_format(&format).unwrap())
            .build(text.as_bytes())
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    fn strings(batch: &RecordBatch, idx: usize) -> Vec<Option<String>> {
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn quotes_are_literal_unless_enabled() {
        let pipes = TextFormat::default().with_field_delimiter(b'|');
        let plain = decode("x|\"b\"\n", 2, pipes);
        assert_eq!(strings(&plain[0], 1), vec![Some("\"b\"".to_string())]);

        let quoted = decode("\"say \"\"hi\"\"\"|\"a|b\"\n", 2, pipes.with_quoted_fields(true));
        assert_eq!(strings(&quoted[0], 0), vec![Some("say \"hi\"".to_string())]);
        assert_eq!(strings(&quoted[0], 1), vec![Some("a|b".to_string())]);
    }

    #[test]
    fn only_the_exact_null_marker_is_null() {
        let pipes = TextFormat::default().with_field_delimiter(b'|');
        let batches = decode("\\N|\\\\N|N|\n", 4, pipes);
        assert_eq!(
            strings(&batches[0], 0)
                .into_iter()
                .chain(strings(&batches[0], 1))
                .chain(strings(&batches[0], 2))
                .chain(strings(&batches[0], 3))
                .collect::<Vec<_>>(),
            vec![
                None,
                Some("\\\\N".to_string()),
                Some("N".to_string()),
                Some(String::new()),
            ]
        );
    }

    #[test]
    fn short_lines_are_padded_with_nulls() {
        let batches = decode("1\x012\n3\n", 2, TextFormat::default());
        assert_eq!(strings(&batches[0], 1), vec![Some("2".to_string()), None]);
    }

    #[test]
    fn custom_line_delimiter_terminates_rows() {
        let format = TextFormat::default()
            .with_field_delimiter(b',')
            .with_line_delimiter(b';');
        let batches = decode("a,1;b,2;", 2, format);
        assert_eq!(batches[0].num_rows(), 2);
        assert_eq!(
            strings(&batches[0], 0),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }
}
