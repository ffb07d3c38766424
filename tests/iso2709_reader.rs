//! Integration tests for decoding ISO 2709 records into field lists.

mod common;

use common::{collect_lists, field_keys, find, RecordFixture, RECORD_TERMINATOR};
use marcxchange::field::{FORMAT_TAG, LEADER_TAG, TYPE_TAG};
use marcxchange::{
    Field, FieldList, Iso2709Reader, MarcError, MarcXchangeListener, MarcXchangeStream,
    NormalizationForm, ReaderConfig, Result,
};
use std::fs::File;
use std::io::{Cursor, Write};

fn title_record() -> RecordFixture {
    RecordFixture::new()
        .field("001", "123456")
        .field("245", "10\x1faTitle\x1fbSubtitle")
}

#[test]
fn test_control_and_data_field_emission() {
    let lists = collect_lists(title_record().build(), ReaderConfig::default()).unwrap();
    let fields: Vec<&FieldList> = lists
        .iter()
        .filter(|l| !matches!(l.tag(), Some("FMT" | "TYP" | "LDR")))
        .collect();
    assert_eq!(fields.len(), 2);

    let control = &fields[0];
    assert_eq!(control.len(), 1);
    assert!(control[0].is_control_field());
    assert_eq!(control[0].data(), "123456");
    assert_eq!(control[0].indicator(), None);

    let title = &fields[1];
    assert_eq!(title.len(), 3);
    assert_eq!(title[0].tag(), "245");
    assert_eq!(title[0].indicator(), Some("10"));
    assert_eq!(title[0].subfield_id(), None);
    assert_eq!(title[1].subfield_id(), Some("a"));
    assert_eq!(title[1].data(), "Title");
    assert_eq!(title[2].subfield_id(), Some("b"));
    assert_eq!(title[2].data(), "Subtitle");
}

#[test]
fn test_record_metadata_leads_each_record() {
    let bytes = title_record().build();
    let label = String::from_utf8(bytes[..24].to_vec()).unwrap();
    let lists = collect_lists(bytes, ReaderConfig::default().with_record_type("Holdings")).unwrap();

    assert_eq!(lists[0].tag(), Some(FORMAT_TAG));
    assert_eq!(lists[0][0].data(), "MARC21");
    assert_eq!(lists[1].tag(), Some(TYPE_TAG));
    assert_eq!(lists[1][0].data(), "Holdings");
    assert_eq!(lists[2].tag(), Some(LEADER_TAG));
    assert_eq!(lists[2][0].data(), label);
    assert_eq!(lists[2][0].position(), None);
}

#[test]
fn test_directory_order_is_preserved() {
    let bytes = RecordFixture::new()
        .field("100", "1 \x1faSmith, John")
        .field("010", "  \x1fa  2001012345")
        .field("245", "10\x1faTitle\x1fbSubtitle")
        .field("001", "123")
        .build();
    let lists = collect_lists(bytes, ReaderConfig::default()).unwrap();

    assert_eq!(
        field_keys(&lists),
        [
            "100$1 100$1 $a",
            "010$  010$  $a",
            "245$10245$10$a245$10$b",
            "001",
        ]
    );
}

#[test]
fn test_multiple_records_share_one_collection() {
    let mut bytes = title_record().build();
    bytes.extend(RecordFixture::new().field("001", "second").build());

    let mut reader = Iso2709Reader::new(Cursor::new(bytes));
    let mut lists: Vec<FieldList> = Vec::new();
    let mut stream = MarcXchangeStream::new();
    stream.add(&mut lists);
    assert_eq!(reader.parse(&mut stream).unwrap(), 2);
    drop(stream);

    let formats = lists.iter().filter(|l| l.tag() == Some(FORMAT_TAG)).count();
    assert_eq!(formats, 2);
    assert_eq!(lists.last().unwrap()[0].data(), "second");
}

#[test]
fn test_mab_dialect_keeps_delimiters_verbatim() {
    #[derive(Default)]
    struct Designators(Vec<Field>);
    impl MarcXchangeListener for Designators {
        fn begin_data_field(&mut self, field: &Field) -> Result<()> {
            self.0.push(field.clone());
            Ok(())
        }
        fn begin_subfield(&mut self, field: &Field) -> Result<()> {
            panic!("MAB fields have no subfields, got {field}");
        }
    }

    let bytes = RecordFixture::new()
        .field("245", "10$aTitle$bSubtitle")
        .field("331", "1 \x1faMain title")
        .build();
    let config = ReaderConfig::default().with_format("MAB");

    let mut raw = Designators::default();
    let mut lists: Vec<FieldList> = Vec::new();
    {
        let mut reader = Iso2709Reader::with_config(Cursor::new(bytes), config).unwrap();
        let mut stream = MarcXchangeStream::new().with_listener(&mut raw);
        stream.add(&mut lists);
        reader.parse(&mut stream).unwrap();
    }

    assert_eq!(raw.0.len(), 2);
    assert_eq!(raw.0[0].indicator(), Some("10"));
    assert_eq!(raw.0[0].subfield_id(), None);
    assert_eq!(raw.0[0].data(), "$aTitle$bSubtitle");
    assert_eq!(raw.0[1].data(), "\x1faMain title");

    // the stream moves direct data into subfield a
    let title = lists.iter().find(|l| l.tag() == Some("245")).unwrap();
    assert_eq!(title.len(), 2);
    assert_eq!(title[0].data(), "");
    assert_eq!(title[1].subfield_id(), Some("a"));
    assert_eq!(title[1].data(), "$aTitle$bSubtitle");
}

#[test]
fn test_short_content_degrades_to_data() {
    let bytes = RecordFixture::new().field("245", "1").build();
    let lists = collect_lists(bytes, ReaderConfig::default()).unwrap();
    let title = lists.iter().find(|l| l.tag() == Some("245")).unwrap();

    assert_eq!(title[0].indicator(), None);
    assert_eq!(title[0].subfield_id(), None);
    assert_eq!(title[1].indicator(), None);
    assert_eq!(title[1].subfield_id(), Some("a"));
    assert_eq!(title[1].data(), "1");
}

#[test]
fn test_label_driven_indicator_length() {
    let bytes = RecordFixture::new()
        .indicator_length(1)
        .field("245", "1\x1faTitle")
        .build();
    let lists = collect_lists(bytes, ReaderConfig::default()).unwrap();
    assert_eq!(field_keys(&lists), ["245$1245$1$a"]);
}

#[test]
fn test_length_reaching_into_next_field_skips_only_that_field() {
    let mut bytes = RecordFixture::new()
        .field("001", "123456")
        .field("245", "10\x1faTitle")
        .build();
    // 001 is 7 bytes long; 17 runs through 245 and ends on its terminator
    bytes[24 + 3..24 + 7].copy_from_slice(b"0017");

    let mut reader = Iso2709Reader::new(Cursor::new(bytes.clone()));
    let mut lists: Vec<FieldList> = Vec::new();
    let mut stream = MarcXchangeStream::new();
    stream.add(&mut lists);
    assert_eq!(reader.parse(&mut stream).unwrap(), 1);
    drop(stream);
    assert_eq!(reader.fields_skipped(), 1);
    assert_eq!(field_keys(&lists), ["245$10245$10$a"]);

    let err = collect_lists(bytes, ReaderConfig::default().with_fatal_errors(true)).unwrap_err();
    assert!(
        matches!(err, MarcError::FieldOutOfBounds { ref tag, .. } if tag == "001"),
        "got {err}"
    );
}

#[test]
fn test_invalid_bytes_in_configured_encoding() {
    let bytes = RecordFixture::new()
        .field("001", "123456")
        .field_bytes("245", b"10\x1faT\xffitle")
        .build();

    let err = collect_lists(bytes.clone(), ReaderConfig::default().with_fatal_errors(true))
        .unwrap_err();
    assert!(matches!(err, MarcError::InvalidField(_)), "got {err}");
    assert!(err.is_structural());

    let mut reader = Iso2709Reader::new(Cursor::new(bytes));
    let mut lists: Vec<FieldList> = Vec::new();
    let mut stream = MarcXchangeStream::new();
    stream.add(&mut lists);
    reader.parse(&mut stream).unwrap();
    drop(stream);
    assert_eq!(reader.fields_skipped(), 1);
    assert_eq!(field_keys(&lists), ["001"]);
}

#[test]
fn test_subfield_spans_are_source_byte_offsets() {
    let bytes = RecordFixture::new()
        .field_bytes("100", b"1 \x1faM\xfcller\x1fbX")
        .build();
    let base = 24 + 12 + 1;
    let lists = collect_lists(bytes, ReaderConfig::default().with_encoding("ISO-8859-1")).unwrap();
    let author = lists.iter().find(|l| l.tag() == Some("100")).unwrap();

    assert_eq!(author[0].position(), Some(base));
    assert_eq!(author[0].length(), Some(14));
    assert_eq!(author[1].data(), "Müller");
    assert_eq!((author[1].position(), author[1].length()), (Some(base + 2), Some(8)));
    assert_eq!((author[2].position(), author[2].length()), (Some(base + 10), Some(3)));
}

#[test]
fn test_inconsistent_field_length_skips_only_that_field() {
    let mut bytes = RecordFixture::new()
        .field("001", "123456")
        .field("245", "10\x1faTitle")
        .field("650", " 0\x1faHistory")
        .build();
    // 245 is 10 bytes long; declare 9 so its slice misses the terminator
    let entry = find(&bytes, b"245");
    bytes[entry + 3..entry + 7].copy_from_slice(b"0009");

    let lists = collect_lists(bytes.clone(), ReaderConfig::default()).unwrap();
    assert_eq!(field_keys(&lists), ["001", "650$ 0650$ 0$a"]);

    let err = collect_lists(bytes, ReaderConfig::default().with_fatal_errors(true)).unwrap_err();
    assert!(
        matches!(err, MarcError::FieldOutOfBounds { ref tag, .. } if tag == "245"),
        "got {err}"
    );
}

#[test]
fn test_field_past_record_length() {
    let mut bytes = RecordFixture::new()
        .field("001", "123456")
        .field("245", "10\x1faTitle")
        .build();
    let entry = find(&bytes, b"245");
    bytes[entry + 7..entry + 12].copy_from_slice(b"09000");

    let mut reader = Iso2709Reader::with_config(
        Cursor::new(bytes.clone()),
        ReaderConfig::default().with_silent_errors(true),
    )
    .unwrap();
    let mut lists: Vec<FieldList> = Vec::new();
    let mut stream = MarcXchangeStream::new();
    stream.add(&mut lists);
    reader.parse(&mut stream).unwrap();
    drop(stream);
    assert_eq!(reader.fields_skipped(), 1);
    assert_eq!(field_keys(&lists), ["001"]);

    let err = collect_lists(bytes, ReaderConfig::default().with_fatal_errors(true)).unwrap_err();
    assert!(err.to_string().contains("Field 245 out of bounds"), "got {err}");
}

#[test]
fn test_unreadable_record_is_skipped_and_parsing_resumes() {
    let mut bytes = b"00100nam a2200090 a 4500\x1e\x1d".to_vec();
    bytes.extend(title_record().build());

    let mut reader = Iso2709Reader::new(Cursor::new(bytes));
    let mut lists: Vec<FieldList> = Vec::new();
    let mut stream = MarcXchangeStream::new();
    stream.add(&mut lists);
    assert_eq!(reader.parse(&mut stream).unwrap(), 1);
    drop(stream);

    assert_eq!(reader.records_skipped(), 1);
    assert_eq!(field_keys(&lists), ["001", "245$10245$10$a245$10$b"]);
}

#[test]
fn test_last_record_without_terminator() {
    let mut bytes = title_record().build();
    assert_eq!(bytes.pop(), Some(RECORD_TERMINATOR));
    let lists = collect_lists(bytes, ReaderConfig::default()).unwrap();
    assert_eq!(field_keys(&lists).len(), 2);
}

#[test]
fn test_custom_subfield_delimiter() {
    let bytes = RecordFixture::new()
        .field("245", "10$aTitle$bSubtitle")
        .build();
    let lists = collect_lists(bytes, ReaderConfig::default().with_subfield_delimiter('$')).unwrap();
    let title = lists.iter().find(|l| l.tag() == Some("245")).unwrap();
    assert_eq!(title.len(), 3);
    assert_eq!(title[2].data(), "Subtitle");
}

#[test]
fn test_latin1_input() {
    let bytes = RecordFixture::new()
        .field_bytes("100", b"1 \x1faM\xfcller, Hans")
        .build();
    let lists = collect_lists(bytes, ReaderConfig::default().with_encoding("ISO-8859-1")).unwrap();
    let author = lists.iter().find(|l| l.tag() == Some("100")).unwrap();
    assert_eq!(author[1].data(), "Müller, Hans");
}

#[test]
fn test_unicode_normalization_from_config() {
    let bytes = RecordFixture::new()
        .field("100", "1 \x1faMu\u{0308}ller, Hans")
        .build();
    let config = ReaderConfig::default().with_normalization(NormalizationForm::Nfc);
    let lists = collect_lists(bytes, config).unwrap();
    let author = lists.iter().find(|l| l.tag() == Some("100")).unwrap();
    assert_eq!(author[1].data(), "Müller, Hans");
}

#[test]
fn test_field_map_renames_and_drops() {
    let bytes = RecordFixture::new()
        .field("001", "123")
        .field("035", "  \x1fa(OCoLC)1")
        .field("852", "  \x1fbMain")
        .build();
    let config = ReaderConfig::default().map_tag("035", "").map_tag("852", "950");
    let lists = collect_lists(bytes, config).unwrap();
    assert_eq!(field_keys(&lists), ["001", "950$  950$  $b"]);
}

#[test]
fn test_listener_errors_abort_regardless_of_policy() {
    struct Refusing;
    impl MarcXchangeListener for Refusing {
        fn begin_data_field(&mut self, _field: &Field) -> Result<()> {
            Err(MarcError::Listener("no data fields".to_string()))
        }
    }

    let mut reader = Iso2709Reader::new(Cursor::new(title_record().build()));
    let err = reader.parse(&mut Refusing).unwrap_err();
    assert!(matches!(err, MarcError::Listener(_)));
}

#[test]
fn test_lists_handed_to_another_thread() {
    let (tx, rx) = crossbeam_channel::bounded::<FieldList>(4);
    let consumer = std::thread::spawn(move || rx.iter().map(|list| list.to_key()).collect::<Vec<_>>());

    let mut bytes = title_record().build();
    bytes.extend(title_record().build());
    let mut reader = Iso2709Reader::new(Cursor::new(bytes));
    {
        let mut stream = MarcXchangeStream::new();
        stream.add(tx);
        reader.parse(&mut stream).unwrap();
    }

    let keys = consumer.join().unwrap();
    assert_eq!(keys.len(), 10);
    assert_eq!(keys[3], "001");
    assert_eq!(keys[4], "245$10245$10$a245$10$b");
}

#[test]
fn test_read_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&title_record().build()).unwrap();
    file.write_all(b"\n").unwrap();
    file.flush().unwrap();

    let config = ReaderConfig::default().with_buffer_size(16);
    let mut reader = Iso2709Reader::with_config(File::open(file.path()).unwrap(), config).unwrap();
    let mut lists: Vec<FieldList> = Vec::new();
    let mut stream = MarcXchangeStream::new();
    stream.add(&mut lists);
    assert_eq!(reader.parse(&mut stream).unwrap(), 1);
    drop(stream);
    assert_eq!(field_keys(&lists).len(), 2);
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = Iso2709Reader::with_config(
        Cursor::new(Vec::new()),
        ReaderConfig::default().with_encoding("no-such-encoding"),
    )
    .unwrap_err();
    assert!(matches!(err, MarcError::Config(_)));
}
