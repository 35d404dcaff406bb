//! Multi-frame responses: result sets and `COM_STMT_PREPARE_OK`.

use super::super::reader::{put_lenenc_bytes, put_lenenc_int, Reader, LENENC_NULL};
use super::super::DecodeError;
use super::response::{is_terminator, EOF};
use super::{push_frame, read_frame, DecodeContext};
use crate::models::mysql::{
    BinaryRow, Cell, ColumnDefinition, RawFrame, ResultSet, Rows, StmtPrepareOk, TextRow,
};

/// `enum_field_types` values with a fixed binary width or a length byte.
mod field_type {
    pub const TINY: u8 = 0x01;
    pub const SHORT: u8 = 0x02;
    pub const LONG: u8 = 0x03;
    pub const FLOAT: u8 = 0x04;
    pub const DOUBLE: u8 = 0x05;
    pub const NULL: u8 = 0x06;
    pub const TIMESTAMP: u8 = 0x07;
    pub const LONGLONG: u8 = 0x08;
    pub const INT24: u8 = 0x09;
    pub const DATE: u8 = 0x0a;
    pub const TIME: u8 = 0x0b;
    pub const DATETIME: u8 = 0x0c;
    pub const YEAR: u8 = 0x0d;
}

fn raw_frame(packet_number: u8, payload: &[u8]) -> RawFrame {
    RawFrame { packet_number, payload: payload.into() }
}

fn count(value: u64, field: &str) -> Result<usize, DecodeError> {
    usize::try_from(value).map_err(|_| DecodeError::invalid(field, "count does not fit in memory"))
}

pub(super) fn decode_column(payload: &[u8], packet_number: u8) -> Result<ColumnDefinition, DecodeError> {
    let mut r = Reader::new(payload);
    Ok(ColumnDefinition {
        packet_number,
        catalog: r.lenenc_string("column catalog")?,
        schema: r.lenenc_string("column schema")?,
        table: r.lenenc_string("column table")?,
        org_table: r.lenenc_string("column org_table")?,
        name: r.lenenc_string("column name")?,
        org_name: r.lenenc_string("column org_name")?,
        fixed_length: r.lenenc_int("column fixed length")?.unwrap_or(0),
        character_set: r.u16_le("column character set")?,
        column_length: r.u32_le("column length")?,
        column_type: r.u8("column type")?,
        flags: r.u16_le("column flags")?,
        decimals: r.u8("column decimals")?,
        filler: r.rest().into(),
    })
}

pub(super) fn encode_column(c: &ColumnDefinition) -> Vec<u8> {
    let mut out = Vec::new();
    for text in [&c.catalog, &c.schema, &c.table, &c.org_table, &c.name, &c.org_name] {
        put_lenenc_bytes(&mut out, text.as_bytes());
    }
    put_lenenc_int(&mut out, c.fixed_length);
    out.extend_from_slice(&c.character_set.to_le_bytes());
    out.extend_from_slice(&c.column_length.to_le_bytes());
    out.push(c.column_type);
    out.extend_from_slice(&c.flags.to_le_bytes());
    out.push(c.decimals);
    out.extend_from_slice(c.filler.as_bytes());
    out
}

fn read_columns(
    r: &mut Reader<'_>,
    n: usize,
) -> Result<Vec<ColumnDefinition>, DecodeError> {
    let mut columns = Vec::with_capacity(n.min(1024));
    for _ in 0..n {
        let (header, payload) = read_frame(r)?;
        columns.push(decode_column(&payload, header.packet_number)?);
    }
    Ok(columns)
}

fn read_eof(r: &mut Reader<'_>, field: &str) -> Result<RawFrame, DecodeError> {
    let (header, payload) = read_frame(r)?;
    if payload.first() != Some(&EOF) {
        return Err(DecodeError::invalid(field, "expected an EOF frame"));
    }
    Ok(raw_frame(header.packet_number, &payload))
}

pub(super) fn decode_result_set(
    payload: &[u8],
    r: &mut Reader<'_>,
    ctx: &DecodeContext,
    binary: bool,
) -> Result<ResultSet, DecodeError> {
    let mut first = Reader::new(payload);
    let column_count = first
        .lenenc_int("column count")?
        .ok_or_else(|| DecodeError::invalid("column count", "unexpected NULL"))?;
    if !first.is_empty() {
        return Err(DecodeError::invalid("column count", "trailing bytes"));
    }
    let columns = read_columns(r, count(column_count, "column count")?)?;
    let eof_after_columns =
        if ctx.deprecate_eof() { None } else { Some(read_eof(r, "column definitions")?) };

    let mut text_rows = Vec::new();
    let mut binary_rows = Vec::new();
    let terminator = loop {
        let (header, row) = read_frame(r)?;
        if is_terminator(&row) {
            break raw_frame(header.packet_number, &row);
        }
        if binary {
            binary_rows.push(decode_binary_row(&row, header.packet_number, &columns)?);
        } else {
            text_rows.push(decode_text_row(&row, header.packet_number, columns.len())?);
        }
    };
    let rows = if binary { Rows::Binary(binary_rows) } else { Rows::Text(text_rows) };

    Ok(ResultSet { column_count, columns, eof_after_columns, rows, terminator })
}

fn decode_text_row(payload: &[u8], packet_number: u8, n: usize) -> Result<TextRow, DecodeError> {
    let mut r = Reader::new(payload);
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(r.lenenc_bytes("text row value")?.map(Cell::from_bytes));
    }
    if !r.is_empty() {
        return Err(DecodeError::invalid("text row", format!("{} trailing bytes", r.remaining())));
    }
    Ok(TextRow { packet_number, values })
}

fn null_bitmap_len(columns: usize) -> usize {
    (columns + 7 + 2) / 8
}

fn is_null(bitmap: &[u8], column: usize) -> bool {
    let bit = column + 2;
    bitmap.get(bit / 8).is_some_and(|byte| byte & (1 << (bit % 8)) != 0)
}

/// Consumes one binary-protocol value, returning its wire bytes including
/// any length prefix.
fn binary_value<'a>(r: &mut Reader<'a>, column_type: u8) -> Result<&'a [u8], DecodeError> {
    use field_type::*;
    let mut probe = r.clone();
    match column_type {
        NULL => {}
        TINY => {
            probe.take(1, "binary value")?;
        }
        SHORT | YEAR => {
            probe.take(2, "binary value")?;
        }
        LONG | INT24 | FLOAT => {
            probe.take(4, "binary value")?;
        }
        LONGLONG | DOUBLE => {
            probe.take(8, "binary value")?;
        }
        DATE | DATETIME | TIMESTAMP | TIME => {
            let len = probe.u8("binary temporal length")?;
            probe.take(usize::from(len), "binary temporal value")?;
        }
        _ => {
            probe.lenenc_bytes("binary value")?;
        }
    }
    let width = probe.position() - r.position();
    r.take(width, "binary value")
}

fn decode_binary_row(
    payload: &[u8],
    packet_number: u8,
    columns: &[ColumnDefinition],
) -> Result<BinaryRow, DecodeError> {
    let mut r = Reader::new(payload);
    let header = r.u8("binary row header")?;
    if header != 0x00 {
        return Err(DecodeError::invalid("binary row header", format!("{header:#04x}")));
    }
    let null_bitmap = r.take(null_bitmap_len(columns.len()), "null bitmap")?;
    let mut values = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        if is_null(null_bitmap, i) {
            values.push(None);
        } else {
            values.push(Some(binary_value(&mut r, column.column_type)?.into()));
        }
    }
    if !r.is_empty() {
        return Err(DecodeError::invalid("binary row", format!("{} trailing bytes", r.remaining())));
    }
    Ok(BinaryRow { packet_number, null_bitmap: null_bitmap.into(), values })
}

pub(super) fn encode_result_set(rs: &ResultSet, seq: u8, out: &mut Vec<u8>) {
    let mut first = Vec::new();
    put_lenenc_int(&mut first, rs.column_count);
    push_frame(out, seq, &first);
    for column in &rs.columns {
        push_frame(out, column.packet_number, &encode_column(column));
    }
    if let Some(eof) = &rs.eof_after_columns {
        push_frame(out, eof.packet_number, eof.payload.as_bytes());
    }
    match &rs.rows {
        Rows::Text(rows) => {
            for row in rows {
                let mut payload = Vec::new();
                for value in &row.values {
                    match value {
                        Some(cell) => put_lenenc_bytes(&mut payload, cell.as_bytes()),
                        None => payload.push(LENENC_NULL),
                    }
                }
                push_frame(out, row.packet_number, &payload);
            }
        }
        Rows::Binary(rows) => {
            for row in rows {
                let mut payload = vec![0x00];
                payload.extend_from_slice(row.null_bitmap.as_bytes());
                for value in row.values.iter().flatten() {
                    payload.extend_from_slice(value.as_bytes());
                }
                push_frame(out, row.packet_number, &payload);
            }
        }
    }
    push_frame(out, rs.terminator.packet_number, rs.terminator.payload.as_bytes());
}

pub(super) fn decode_prepare_ok(
    payload: &[u8],
    r: &mut Reader<'_>,
    ctx: &DecodeContext,
) -> Result<StmtPrepareOk, DecodeError> {
    let mut p = Reader::new(payload);
    p.u8("prepare ok status")?;
    let statement_id = p.u32_le("statement id")?;
    let num_columns = p.u16_le("num columns")?;
    let num_params = p.u16_le("num params")?;
    let filler = p.u8("prepare ok filler")?;
    let warning_count = p.u16_le("warning count")?;
    let metadata_follows = if p.is_empty() { None } else { Some(p.u8("metadata follows")?) };
    if !p.is_empty() {
        return Err(DecodeError::invalid("prepare ok", format!("{} trailing bytes", p.remaining())));
    }

    let param_definitions = read_columns(r, usize::from(num_params))?;
    let eof_after_params = if num_params > 0 && !ctx.deprecate_eof() {
        Some(read_eof(r, "parameter definitions")?)
    } else {
        None
    };
    let column_definitions = read_columns(r, usize::from(num_columns))?;
    let eof_after_columns = if num_columns > 0 && !ctx.deprecate_eof() {
        Some(read_eof(r, "column definitions")?)
    } else {
        None
    };

    Ok(StmtPrepareOk {
        statement_id,
        num_columns,
        num_params,
        filler,
        warning_count,
        metadata_follows,
        param_definitions,
        eof_after_params,
        column_definitions,
        eof_after_columns,
    })
}

pub(super) fn encode_prepare_ok(ok: &StmtPrepareOk, seq: u8, out: &mut Vec<u8>) {
    let mut first = vec![0x00];
    first.extend_from_slice(&ok.statement_id.to_le_bytes());
    first.extend_from_slice(&ok.num_columns.to_le_bytes());
    first.extend_from_slice(&ok.num_params.to_le_bytes());
    first.push(ok.filler);
    first.extend_from_slice(&ok.warning_count.to_le_bytes());
    if let Some(flag) = ok.metadata_follows {
        first.push(flag);
    }
    push_frame(out, seq, &first);
    let groups = [
        (&ok.param_definitions, &ok.eof_after_params),
        (&ok.column_definitions, &ok.eof_after_columns),
    ];
    for (definitions, eof) in groups {
        for column in definitions {
            push_frame(out, column.packet_number, &encode_column(column));
        }
        if let Some(eof) = eof {
            push_frame(out, eof.packet_number, eof.payload.as_bytes());
        }
    }
}
