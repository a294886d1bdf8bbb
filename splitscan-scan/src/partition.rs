//! Partition metadata shared by every scan range of a partition.

use std::fmt;
use std::sync::Arc;

use splitscan_result::Result;
use splitscan_types::{FileFormat, Literal, PartitionId, TemplateTupleCell};

/// A partition-key expression. Always a constant, so it evaluates without a
/// row.
pub trait PartitionKeyExpr: Send + Sync + fmt::Debug {
    fn evaluate_literal(&self) -> Result<Literal>;
}

impl PartitionKeyExpr for Literal {
    fn evaluate_literal(&self) -> Result<Literal> {
        Ok(self.clone())
    }
}

/// Delimiters of a text-format partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFormat {
    pub field_delimiter: u8,
    pub line_delimiter: u8,
    /// Honour `"` quoting when splitting fields.
    pub quoted_fields: bool,
    /// Declared fields per line. Lines may be shorter; longer lines fail.
    /// Defaults to the highest materialized file column.
    pub num_columns: Option<usize>,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            // Hive's default field separator (^A).
            field_delimiter: 0x01,
            line_delimiter: b'\n',
            quoted_fields: false,
            num_columns: None,
        }
    }
}

impl TextFormat {
    pub fn with_field_delimiter(mut self, delimiter: u8) -> Self {
        self.field_delimiter = delimiter;
        self
    }

    pub fn with_line_delimiter(mut self, delimiter: u8) -> Self {
        self.line_delimiter = delimiter;
        self
    }

    pub fn with_quoted_fields(mut self, quoted: bool) -> Self {
        self.quoted_fields = quoted;
        self
    }

    pub fn with_num_columns(mut self, num_columns: usize) -> Self {
        self.num_columns = Some(num_columns);
        self
    }
}

/// Per-fragment partition metadata.
///
/// Everything is immutable except the template tuple cell, which carries its
/// own lock.
#[derive(Debug)]
pub struct PartitionDescriptor {
    id: PartitionId,
    file_format: FileFormat,
    key_exprs: Vec<Arc<dyn PartitionKeyExpr>>,
    text_format: TextFormat,
    template: TemplateTupleCell,
}

impl PartitionDescriptor {
    pub fn new(id: PartitionId, file_format: FileFormat) -> Self {
        Self {
            id,
            file_format,
            key_exprs: Vec::new(),
            text_format: TextFormat::default(),
            template: TemplateTupleCell::new(),
        }
    }

    /// Append the next partition-key expression (column position order).
    pub fn with_key_expr(mut self, expr: impl PartitionKeyExpr + 'static) -> Self {
        self.key_exprs.push(Arc::new(expr));
        self
    }

    /// Append constant partition-key values.
    pub fn with_key_values<I, L>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        for value in values {
            self.key_exprs.push(Arc::new(value.into()));
        }
        self
    }

    pub fn with_text_format(mut self, text_format: TextFormat) -> Self {
        self.text_format = text_format;
        self
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    /// Partition-key expressions indexed by column position.
    pub fn partition_key_exprs(&self) -> &[Arc<dyn PartitionKeyExpr>] {
        &self.key_exprs
    }

    pub fn num_partition_keys(&self) -> usize {
        self.key_exprs.len()
    }

    pub fn text_format(&self) -> TextFormat {
        self.text_format
    }

    /// The partition's template tuple.
    pub fn template(&self) -> &TemplateTupleCell {
        &self.template
    }
}
