use std::io::{self, Read};
use tabular_stream::{
    from_str, to_string, BufferKind, Dialect, Error, FieldType, PositionType, Record,
    TabularFieldReader, TabularFieldWriter, TabularOptions,
};

/// Reader handing out at most `chunk` bytes per call.
struct Trickle<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fn newline_dialect() -> Dialect {
    Dialect::new("\n", ',', '"').unwrap()
}

fn read_fields<R: Read>(reader: &mut TabularFieldReader<R>) -> Result<Vec<Vec<String>>, Error> {
    let mut records = Vec::new();
    while reader.pick_record()? {
        let mut record = Vec::new();
        while reader.read_field()? {
            record.push(reader.value().to_string());
        }
        records.push(record);
    }
    Ok(records)
}

#[test]
fn test_quoted_delimiter_then_end_of_stream() {
    let dialect = newline_dialect();
    let input: &[u8] = b"a,\"b,c\",d\n";
    let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();

    assert!(reader.pick_record().unwrap());
    let mut fields = Vec::new();
    while reader.read_field().unwrap() {
        fields.push(reader.value().to_string());
    }
    assert_eq!(fields, vec!["a", "b,c", "d"]);
    assert_eq!(reader.position_type(), PositionType::EndOfRecord);
    assert!(!reader.pick_record().unwrap());
    assert_eq!(reader.position_type(), PositionType::EndOfStream);
}

#[test]
fn test_quote_doubling() {
    let dialect = newline_dialect();
    let input: &[u8] = b"a,\"b\"\"c\"\n";
    let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();
    assert!(reader.pick_record().unwrap());
    assert!(reader.read_field().unwrap());
    assert!(reader.read_field().unwrap());
    assert_eq!(reader.value(), "b\"c");
    assert_eq!(reader.buffer_kind(), BufferKind::Private);
}

#[test]
fn test_annotation_then_values() {
    let dialect = newline_dialect().with_annotation_prefix('#').unwrap();
    let records = from_str("#note\nx,y\n", &dialect).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].is_annotation());
    assert_eq!(records[0].get(0), Some("note"));
    assert!(!records[1].is_annotation());
    assert_eq!(records[1].to_vec(), vec!["x", "y"]);
}

#[test]
fn test_annotation_prefix_only_counts_at_record_start() {
    let dialect = newline_dialect().with_annotation_prefix('#').unwrap();
    let input: &[u8] = b"x,#y\n";
    let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();
    assert!(reader.pick_record().unwrap());
    reader.read_field().unwrap();
    reader.read_field().unwrap();
    assert_eq!(reader.field_type(), FieldType::Value);
    assert_eq!(reader.value(), "#y");
}

#[test]
fn test_write_value_with_quotes_and_delimiter() {
    let dialect = Dialect::default();
    let mut writer = TabularFieldWriter::new(Vec::new(), &dialect, &TabularOptions::new()).unwrap();
    writer.write_value("he said \"hi\",there").unwrap();
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes, b"\"he said \"\"hi\"\",there\"");

    let records = from_str(std::str::from_utf8(&bytes).unwrap(), &dialect).unwrap();
    assert_eq!(records[0].get(0), Some("he said \"hi\",there"));
}

#[test]
fn test_unterminated_quote_is_format_error() {
    let dialect = newline_dialect();
    let input: &[u8] = b"a,\"bc";
    let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();
    assert!(reader.pick_record().unwrap());
    assert!(reader.read_field().unwrap());
    assert_eq!(reader.value(), "a");
    match reader.read_field() {
        Err(Error::Format { position, .. }) => assert_eq!(position, 5),
        other => panic!("Expected format error, got {other:?}"),
    }
}

#[test]
fn test_unquoted_value_closed_at_end_of_stream() {
    let records = from_str("a,b", &newline_dialect()).unwrap();
    assert_eq!(records, vec![["a", "b"].into_iter().collect::<Record>()]);
}

#[test]
fn test_trailing_delimiter_gives_empty_field() {
    let records = from_str("a,\n,", &newline_dialect()).unwrap();
    assert_eq!(records[0].to_vec(), vec!["a", ""]);
    assert_eq!(records[1].to_vec(), vec!["", ""]);
}

#[test]
fn test_lone_carriage_return_is_content() {
    let dialect = Dialect::default();
    let records = from_str("a\rb,c\r\n", &dialect).unwrap();
    assert_eq!(records[0].to_vec(), vec!["a\rb", "c"]);

    let err = from_str("\"a\"\rb", &dialect).unwrap_err();
    assert_eq!(err.position(), Some(4));
}

#[test]
fn test_distinct_escape_character() {
    let dialect = newline_dialect().with_escape('\\').unwrap();
    let records = from_str("\"x\\\"y\\\\z\",w\n", &dialect).unwrap();
    assert_eq!(records[0].to_vec(), vec!["x\"y\\z", "w"]);

    let err = from_str("\"x\\y\"", &dialect).unwrap_err();
    assert!(matches!(err, Error::Format { position: 3, .. }));
}

#[test]
fn test_dialect_validation() {
    assert!(matches!(Dialect::new("\n", ',', ','), Err(Error::Dialect(_))));
    assert!(Dialect::new("\n\n", ',', '"').is_err());
    assert!(Dialect::new("", ',', '"').is_err());
    assert!(Dialect::new("\r\n", '\n', '"').is_err());
    let base = Dialect::new("\r\n", ',', '"').unwrap();
    assert!(base.clone().with_annotation_prefix('"').is_err());
    assert!(base.clone().with_annotation_prefix(',').is_err());
    assert!(base.clone().with_escape(',').is_err());
    assert!(base.clone().with_escape('"').is_ok());
    assert!(base.with_annotation_prefix('#').is_ok());
}

#[test]
fn test_tiny_reads_match_whole_input() {
    let dialect = Dialect::default().with_annotation_prefix(';').unwrap();
    let text = ";head\r\n\"é,😀\",\"x\"\"y\",plain\r\n\r\n\"multi\r\nline\",\r";
    let options = TabularOptions::new().with_buffer_size(1);

    let whole = read_fields(
        &mut TabularFieldReader::new(text.as_bytes(), &dialect, &options).unwrap(),
    )
    .unwrap();
    assert_eq!(whole.len(), 4);
    assert_eq!(whole[3], vec!["multi\r\nline", "\r"]);

    for chunk in 1..8 {
        let input = Trickle {
            data: text.as_bytes(),
            chunk,
        };
        let mut reader = TabularFieldReader::new(input, &dialect, &options).unwrap();
        assert_eq!(read_fields(&mut reader).unwrap(), whole, "chunk size {chunk}");
        assert_eq!(reader.bytes_consumed(), text.len() as u64);
        assert_eq!(reader.position(), text.chars().count() as u64);
    }
}

#[test]
fn test_zero_copy_matches_private_copy() {
    let dialect = newline_dialect();
    let values = ["plain", "with space", "ünïcödé"];
    for value in values {
        let plain = format!("{value}\n");
        let quoted = format!("\"{value}\"\n");
        let escaped = format!("\"{value}\"\"\"\n");

        let mut reader =
            TabularFieldReader::new(plain.as_bytes(), &dialect, &TabularOptions::new()).unwrap();
        reader.pick_record().unwrap();
        reader.read_field().unwrap();
        assert_eq!(reader.buffer_kind(), BufferKind::Shared);
        let shared = reader.value().to_string();

        let mut reader =
            TabularFieldReader::new(quoted.as_bytes(), &dialect, &TabularOptions::new()).unwrap();
        reader.pick_record().unwrap();
        reader.read_field().unwrap();
        assert_eq!(reader.value(), shared);

        let mut reader =
            TabularFieldReader::new(escaped.as_bytes(), &dialect, &TabularOptions::new()).unwrap();
        reader.pick_record().unwrap();
        reader.read_field().unwrap();
        assert_eq!(reader.buffer_kind(), BufferKind::Private);
        assert_eq!(reader.value(), format!("{shared}\""));
    }
}

#[test]
fn test_utf16_round_trip_with_bom() {
    let dialect = newline_dialect();
    let options = TabularOptions::new()
        .with_encoding(encoding_rs::UTF_16LE)
        .with_byte_order_mark(true)
        .with_buffer_size(3);
    let mut writer = TabularFieldWriter::new(Vec::new(), &dialect, &options).unwrap();
    writer.write_value("ü").unwrap();
    writer.write_value("😀,x").unwrap();
    writer.end_record();
    let bytes = writer.finish().unwrap();
    assert_eq!(&bytes[..4], &[0xFF, 0xFE, 0xFC, 0x00]);

    let input = Trickle {
        data: &bytes,
        chunk: 1,
    };
    let mut reader = TabularFieldReader::new(input, &dialect, &options).unwrap();
    assert_eq!(
        read_fields(&mut reader).unwrap(),
        vec![vec!["ü".to_string(), "😀,x".to_string()]]
    );
}

#[test]
fn test_legacy_encoding() {
    let dialect = Dialect::new("\n", ';', '"').unwrap();
    let options = TabularOptions::new().with_encoding(encoding_rs::WINDOWS_1252);
    let input: &[u8] = b"caf\xE9;\x80\n";
    let mut reader = TabularFieldReader::new(input, &dialect, &options).unwrap();
    assert_eq!(
        read_fields(&mut reader).unwrap(),
        vec![vec!["café".to_string(), "€".to_string()]]
    );
}

#[test]
fn test_counters() {
    let dialect = newline_dialect().with_annotation_prefix('#').unwrap();
    let text = "#c\na,b\nc\n";
    let mut reader =
        TabularFieldReader::new(text.as_bytes(), &dialect, &TabularOptions::new()).unwrap();
    read_fields(&mut reader).unwrap();
    assert_eq!(reader.fields_read(), 4);
    assert_eq!(reader.records_read(), 3);

    let records = from_str(text, &dialect).unwrap();
    let mut writer = TabularFieldWriter::new(Vec::new(), &dialect, &TabularOptions::new()).unwrap();
    for record in &records {
        writer.begin_record();
        if record.is_annotation() {
            writer.write_annotation(record.get(0).unwrap()).unwrap();
        } else {
            for value in record {
                writer.write_value(value).unwrap();
            }
        }
    }
    writer.end_record();
    assert_eq!(writer.fields_written(), 4);
    assert_eq!(writer.records_written(), 3);
    assert_eq!(writer.position(), text.chars().count() as u64);
    assert_eq!(writer.finish().unwrap(), text.as_bytes());
}

#[test]
fn test_facade_round_trip_with_annotations() {
    let dialect = Dialect::new("\r\n", '\t', '\'')
        .and_then(|d| d.with_annotation_prefix('!'))
        .unwrap();
    let records = vec![
        Record::annotation("exported"),
        ["!bang", "tab\there", "it's"].into_iter().collect::<Record>(),
        ["", "", ""].into_iter().collect::<Record>(),
    ];
    let text = to_string(&records, &dialect).unwrap();
    assert_eq!(text, "!exported\r\n'!bang'\t'tab\there'\t'it''s'\r\n\t\t\r\n");
    assert_eq!(from_str(&text, &dialect).unwrap(), records);
}
