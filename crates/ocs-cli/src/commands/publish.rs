//! `ocs publish`: push an order document onto the bus.
//!
//! Without `--fresh-uid` the file bytes go out verbatim, malformed or not,
//! which is how the daemon's drop-and-continue path is exercised by hand.
//! With it, the file must decode as an order and each copy gets a new v4
//! `order_uid`.

use anyhow::{Context, Result};
use bytes::Bytes;
use ocs_schemas::OrderRecord;
use std::fs;
use uuid::Uuid;

pub struct PublishArgs {
    pub file: String,
    pub subject: String,
    pub nats_url: String,
    pub fresh_uid: bool,
    pub count: u32,
}

/// Payloads to send, paired with the order id when known.
pub fn build_payloads(raw: &[u8], fresh_uid: bool, count: u32) -> Result<Vec<(Option<String>, Vec<u8>)>> {
    if !fresh_uid {
        let uid = OrderRecord::from_json(raw).ok().map(|o| o.order_uid);
        return Ok((0..count).map(|_| (uid.clone(), raw.to_vec())).collect());
    }

    let template = OrderRecord::from_json(raw).context("--fresh-uid needs a decodable order file")?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut order = template.clone();
        order.order_uid = Uuid::new_v4().to_string();
        let bytes = order.to_json().context("encode order failed")?;
        out.push((Some(order.order_uid), bytes));
    }
    Ok(out)
}

pub async fn publish(args: PublishArgs) -> Result<()> {
    let raw = fs::read(&args.file).with_context(|| format!("read order file failed: {}", args.file))?;
    let payloads = build_payloads(&raw, args.fresh_uid, args.count)?;

    let client = async_nats::connect(&args.nats_url)
        .await
        .with_context(|| format!("connect nats failed: url={}", args.nats_url))?;

    for (uid, bytes) in payloads {
        let len = bytes.len();
        client
            .publish(args.subject.clone(), Bytes::from(bytes))
            .await
            .with_context(|| format!("publish failed: subject={}", args.subject))?;
        println!(
            "published=true subject={} order_uid={} bytes={}",
            args.subject,
            uid.as_deref().unwrap_or("<undecodable>"),
            len
        );
    }

    client.flush().await.context("nats flush failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../../../fixtures/model.json");

    #[test]
    fn verbatim_payloads_keep_file_bytes() {
        let out = build_payloads(b"{not json", false, 2).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, None);
        assert_eq!(out[0].1, b"{not json".to_vec());
    }

    #[test]
    fn verbatim_payloads_report_the_file_uid() {
        let out = build_payloads(SAMPLE.as_bytes(), false, 1).unwrap();
        assert_eq!(out[0].0.as_deref(), Some("b563feb7b2b84b6test"));
    }

    #[test]
    fn fresh_uid_payloads_are_distinct_orders() {
        let out = build_payloads(SAMPLE.as_bytes(), true, 3).unwrap();
        let uids: std::collections::HashSet<_> = out.iter().filter_map(|(u, _)| u.clone()).collect();
        assert_eq!(uids.len(), 3);
        for (uid, bytes) in &out {
            let order = OrderRecord::from_json(bytes).unwrap();
            assert_eq!(Some(order.order_uid.clone()), *uid);
            assert_eq!(order.track_number, "WBILMTESTTRACK");
        }
    }

    #[test]
    fn fresh_uid_rejects_undecodable_file() {
        assert!(build_payloads(b"[]", true, 1).is_err());
    }
}
