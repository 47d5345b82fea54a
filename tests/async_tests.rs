#![cfg(feature = "tokio")]

use std::pin::Pin;
use std::task::{Context, Poll};
use tabular_stream::{
    from_str, Dialect, DisplayConverter, Error, Headers, PositionType, Record, RecordHandler,
    TabularFieldReader, TabularFieldWriter, TabularOptions, TabularReader, TabularWriter,
};
use tokio::io::{AsyncRead, ReadBuf};

/// Async reader yielding at most `chunk` bytes per poll, pending every other poll.
struct SlowReader {
    data: Vec<u8>,
    offset: usize,
    chunk: usize,
    ready: bool,
}

impl SlowReader {
    fn new(data: &[u8], chunk: usize) -> Self {
        SlowReader {
            data: data.to_vec(),
            offset: 0,
            chunk,
            ready: false,
        }
    }
}

impl AsyncRead for SlowReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if !self.ready {
            self.ready = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        self.ready = false;
        let end = (self.offset + self.chunk)
            .min(self.data.len())
            .min(self.offset + buf.remaining());
        let start = self.offset;
        buf.put_slice(&self.data[start..end]);
        self.offset = end;
        Poll::Ready(Ok(()))
    }
}

const TEXT: &str = "#made by hand\r\nid,name\r\n1,\"Smith, J\"\r\n2,\"say \"\"x\"\"\"\r\n3,é😀\r\n";

fn dialect() -> Dialect {
    Dialect::default().with_annotation_prefix('#').unwrap()
}

#[tokio::test]
async fn test_async_fields_match_sync() {
    let dialect = dialect();
    let options = TabularOptions::new().with_buffer_size(1);
    let expected = from_str(TEXT, &dialect).unwrap();

    for chunk in [1, 3, 64] {
        let mut reader =
            TabularFieldReader::new(SlowReader::new(TEXT.as_bytes(), chunk), &dialect, &options)
                .unwrap();
        let mut records = Vec::new();
        while reader.pick_record_async().await.unwrap() {
            let mut record = Record::new();
            while reader.read_field_async().await.unwrap() {
                record.push_field(reader.value());
            }
            records.push(record);
        }
        assert_eq!(reader.position_type(), PositionType::EndOfStream);
        assert_eq!(reader.bytes_consumed(), TEXT.len() as u64);
        let values: Vec<Vec<String>> = records.iter().map(Record::to_vec).collect();
        let expected: Vec<Vec<String>> = expected.iter().map(Record::to_vec).collect();
        assert_eq!(values, expected);
    }
}

#[tokio::test]
async fn test_async_skip_and_error() {
    let dialect = Dialect::new("\n", ',', '"').unwrap();
    let input: &[u8] = b"a,b\nc,\"d";
    let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();
    assert!(reader.pick_record_async().await.unwrap());
    while reader.skip_field_async().await.unwrap() {}
    assert!(reader.pick_record_async().await.unwrap());
    assert!(reader.read_field_async().await.unwrap());
    let err = reader.read_field_async().await.unwrap_err();
    assert!(matches!(err, Error::Format { position: 8, .. }));
    assert!(reader.pick_record_async().await.is_err());
}

#[tokio::test]
async fn test_async_writer_matches_sync() {
    let dialect = dialect();
    let options = TabularOptions::new()
        .with_byte_order_mark(true)
        .with_buffer_size(2);
    let records = from_str(TEXT, &dialect).unwrap();

    let mut sync_writer = TabularWriter::new(Vec::new(), &dialect, &options).unwrap();
    let mut async_writer = TabularWriter::new(Vec::new(), &dialect, &options).unwrap();
    for record in &records {
        sync_writer.write(record).unwrap();
        async_writer.write_async(record).await.unwrap();
    }
    let sync_bytes = sync_writer.finish().unwrap();
    let async_bytes = async_writer.finish_async().await.unwrap();
    assert_eq!(async_bytes, sync_bytes);
    assert_eq!(&async_bytes[3..], TEXT.as_bytes());
}

#[tokio::test]
async fn test_async_field_writer() {
    let dialect = dialect();
    let mut writer = TabularFieldWriter::new(Vec::new(), &dialect, &TabularOptions::new()).unwrap();
    writer.write_annotation_async("v2").await.unwrap();
    writer.begin_record();
    writer.write_async(&7u8, &DisplayConverter).await.unwrap();
    writer.write_value_async("#x").await.unwrap();
    writer.end_record();
    writer.flush_async().await.unwrap();
    assert_eq!(writer.get_ref().as_slice(), b"#v2\r\n7,#x\r\n");
    assert_eq!(writer.finish_async().await.unwrap(), b"#v2\r\n7,#x\r\n");
}

struct Named;

impl RecordHandler<(u32, String)> for Named {
    fn read(&self, record: &Record, headers: Option<&Headers>) -> tabular_stream::Result<(u32, String)> {
        let headers = headers.ok_or_else(|| Error::invalid_operation("no headers"))?;
        let id_index = headers
            .index_of("id")
            .ok_or_else(|| Error::invalid_argument("no id column"))?;
        let name = record.get_by_name(headers, "name").unwrap_or_default();
        Ok((record.parse(id_index, &DisplayConverter)?, name.to_string()))
    }

    fn write(&self, value: &(u32, String), fields: &mut Vec<String>) -> tabular_stream::Result<()> {
        fields.push(value.0.to_string());
        fields.push(value.1.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_async_typed_records() {
    let dialect = dialect();
    let options = TabularOptions::new().with_header(true);
    let mut reader =
        TabularReader::new(SlowReader::new(TEXT.as_bytes(), 5), &dialect, &options).unwrap();
    let headers = reader.headers_async().await.unwrap().cloned().unwrap();
    assert_eq!(headers.names().collect::<Vec<_>>(), vec!["id", "name"]);

    let mut rows = Vec::new();
    while let Some(row) = reader.read_as_async(&Named).await.unwrap() {
        rows.push(row);
    }
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], (1, "Smith, J".to_string()));
    assert_eq!(rows[1], (2, "say \"x\"".to_string()));

    let mut writer = TabularWriter::new(Vec::new(), &dialect, &TabularOptions::new()).unwrap();
    writer.write_annotation_async("made by hand").await.unwrap();
    writer.write_header_async(headers.names()).await.unwrap();
    for row in &rows {
        writer.write_as_async(row, &Named).await.unwrap();
    }
    let bytes = writer.finish_async().await.unwrap();
    assert_eq!(bytes, TEXT.as_bytes());
}

#[tokio::test]
async fn test_async_skip_record() {
    let dialect = dialect();
    let mut reader =
        TabularReader::new(TEXT.as_bytes(), &dialect, &TabularOptions::new()).unwrap();
    assert!(reader.skip_record_async().await.unwrap());
    assert!(reader.skip_record_async().await.unwrap());
    let mut record = Record::new();
    assert!(reader.read_record_async(&mut record).await.unwrap());
    assert_eq!(record.get(1), Some("Smith, J"));
}
