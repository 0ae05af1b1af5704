//! Line-framed server-sent-event decoding for search streams.
//!
//! The service emits one record per `data:` line, each carrying one complete
//! JSON object. Network delivery does not respect record boundaries: a single
//! read may contain zero, one, partial, or many records. The decoder keeps a
//! carry-over buffer and only yields a line once its terminating newline has
//! arrived, so any chunk granularity produces the same record sequence.

use crate::backend::BackendEvent;
use crate::models::SearchUpdate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseRecord {
    pub data: String,
}

#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseRecord> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf[..idx].to_vec();
            self.buf.drain(..=idx);
            if let Some(record) = parse_sse_line(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Drains a final record whose line was never newline-terminated.
    pub fn finish(&mut self) -> Option<SseRecord> {
        if self.buf.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        parse_sse_line(&line)
    }
}

fn parse_sse_line(bytes: &[u8]) -> Option<SseRecord> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim_end_matches('\r');
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(SseRecord {
        data: data.to_string(),
    })
}

pub(crate) fn record_to_event(record: &SseRecord) -> BackendEvent {
    match serde_json::from_str::<SearchUpdate>(&record.data) {
        Ok(update) => BackendEvent::Update(update),
        Err(e) => BackendEvent::Malformed {
            message: format!("invalid search record JSON: {e}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(search_id: &str, fragment: &str) -> String {
        format!(
            concat!(
                r#"{{"search":{{"search_id":"{}","thread_id":"f2a24963-9cd0-4bd7-9f39-83a0c7f1d64d","#,
                r#""query":"q","result":"{}","created_at":"2024-05-01T12:00:00Z","#,
                r#""updated_at":"2024-05-01T12:00:01Z"}},"sources":[]}}"#
            ),
            search_id, fragment
        )
    }

    fn decode_all(decoder: &mut SseDecoder, chunks: &[&[u8]]) -> Vec<SseRecord> {
        let mut records = Vec::new();
        for chunk in chunks {
            records.extend(decoder.push_chunk(chunk));
        }
        records.extend(decoder.finish());
        records
    }

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let part1 = b"data: {\"search\":{\"search_id\":\"7f2c1e7e-48ef-44d4-b5e9-cbe";
        let part2 = b"9a9d4c2aa\"}}\n";
        assert!(decoder.push_chunk(part1).is_empty());
        let records = decoder.push_chunk(part2);
        assert_eq!(records.len(), 1);
        assert!(records[0].data.contains("7f2c1e7e"));
    }

    #[test]
    fn any_chunk_granularity_yields_the_same_records() {
        let body = format!(
            "data: {}\n: keep-alive\ndata: {}\n",
            record_json("7f2c1e7e-48ef-44d4-b5e9-cbe9a9d4c2aa", "one"),
            record_json("0e6fda0e-6e4f-4d63-9f2e-0e4d1f6b8a11", "two"),
        );
        let bytes = body.as_bytes();

        let mut whole = SseDecoder::default();
        let expected = decode_all(&mut whole, &[bytes]);
        assert_eq!(expected.len(), 2);

        for size in 1..=bytes.len() {
            let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
            let mut decoder = SseDecoder::default();
            let records = decode_all(&mut decoder, &chunks);
            assert_eq!(records, expected, "chunk size {size} diverged");
        }
    }

    #[test]
    fn records_split_across_three_chunks_decode_in_order() {
        let first = record_json("7f2c1e7e-48ef-44d4-b5e9-cbe9a9d4c2aa", "s1");
        let second = record_json("0e6fda0e-6e4f-4d63-9f2e-0e4d1f6b8a11", "s2");
        let (first_head, first_tail) = first.split_at(20);

        let mut decoder = SseDecoder::default();
        assert!(
            decoder
                .push_chunk(format!("data: {first_head}").as_bytes())
                .is_empty()
        );
        assert!(decoder.push_chunk(first_tail.as_bytes()).is_empty());
        let records = decoder.push_chunk(format!("\ndata: {second}\n").as_bytes());
        assert_eq!(records.len(), 2);

        let events: Vec<BackendEvent> = records.iter().map(record_to_event).collect();
        let ids: Vec<String> = events
            .iter()
            .map(|event| match event {
                BackendEvent::Update(update) => update.search.search_id.to_string(),
                other => panic!("expected Update, got {other:?}"),
            })
            .collect();
        assert_eq!(
            ids,
            vec![
                "7f2c1e7e-48ef-44d4-b5e9-cbe9a9d4c2aa",
                "0e6fda0e-6e4f-4d63-9f2e-0e4d1f6b8a11"
            ]
        );
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn malformed_record_does_not_corrupt_subsequent_records() {
        let valid = record_json("7f2c1e7e-48ef-44d4-b5e9-cbe9a9d4c2aa", "ok");
        let mut decoder = SseDecoder::default();
        let records =
            decoder.push_chunk(format!("data: {{\"search\": oops}}\ndata: {valid}\n").as_bytes());
        assert_eq!(records.len(), 2);

        assert!(matches!(
            record_to_event(&records[0]),
            BackendEvent::Malformed { .. }
        ));
        assert!(matches!(
            record_to_event(&records[1]),
            BackendEvent::Update(_)
        ));
    }

    #[test]
    fn comments_blank_lines_and_done_sentinel_are_ignored() {
        let mut decoder = SseDecoder::default();
        let records = decoder.push_chunk(b": ping\n\nevent: message\ndata: [DONE]\ndata:\n");
        assert!(records.is_empty());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let valid = record_json("7f2c1e7e-48ef-44d4-b5e9-cbe9a9d4c2aa", "ok");
        let mut decoder = SseDecoder::default();
        let records = decoder.push_chunk(format!("data: {valid}\r\n").as_bytes());
        assert_eq!(records.len(), 1);
        assert!(matches!(
            record_to_event(&records[0]),
            BackendEvent::Update(_)
        ));
    }

    #[test]
    fn finish_decodes_an_unterminated_tail() {
        let valid = record_json("7f2c1e7e-48ef-44d4-b5e9-cbe9a9d4c2aa", "tail");
        let mut decoder = SseDecoder::default();
        assert!(
            decoder
                .push_chunk(format!("data: {valid}").as_bytes())
                .is_empty()
        );
        let record = decoder.finish().expect("tail record");
        assert!(matches!(record_to_event(&record), BackendEvent::Update(_)));
        assert!(decoder.finish().is_none());
    }
}
