//! Dissection of a full captured frame through the built-in layers.

use lancet::{decode, encode, PacketType, Value};

const HTTP_REQUEST: &[u8] =
    b"HEAD / HTTP/1.1\r\nHost: example.com\r\nUser-Agent: lancet\r\n\r\n";

fn http_frame() -> Vec<u8> {
    let mut frame = hex::decode(concat!(
        "00e08100b02800096b88f5c90800",
        "45000062d24940008006c8ba0a000005cf2e865e",
        "0cc30050a80076877de014025018faf0ad620000",
    ))
    .unwrap();
    frame.extend_from_slice(HTTP_REQUEST);
    frame
}

#[test]
fn ethernet_ipv4_tcp_chain() {
    lancet::register_defaults().unwrap();
    let eth = PacketType::lookup("Ethernet").unwrap();

    let frame = http_frame();
    let p = decode(&eth, &frame);
    assert_eq!(p.summary(), "Ethernet / IPv4 / TCP / Raw");

    assert_eq!(p.get_display("dst").unwrap(), "00:e0:81:00:b0:28");
    assert_eq!(p.get_display("src").unwrap(), "00:09:6b:88:f5:c9");
    assert_eq!(p.get_display("ethertype").unwrap(), "0x0800");

    let ip = p.layer("ip").unwrap();
    assert_eq!(ip.get("version").unwrap(), Value::UInt(4));
    assert_eq!(ip.get("ihl").unwrap(), Value::UInt(5));
    assert_eq!(ip.get("len").unwrap(), Value::UInt(0x62));
    assert_eq!(ip.get("ttl").unwrap(), Value::UInt(128));
    assert_eq!(ip.get("proto").unwrap(), Value::UInt(6));
    assert_eq!(ip.get("src").unwrap(), Value::Ip4("10.0.0.5".parse().unwrap()));
    assert_eq!(
        ip.get("dst").unwrap(),
        Value::Ip4("207.46.134.94".parse().unwrap())
    );

    let tcp = p.layer("tcp").unwrap();
    assert_eq!(tcp.get("sport").unwrap(), Value::UInt(3267));
    assert_eq!(tcp.get("dport").unwrap(), Value::UInt(80));
    assert_eq!(tcp.get("seq").unwrap(), Value::UInt(0xa8007687));
    assert_eq!(tcp.get("ack").unwrap(), Value::UInt(0x7de01402));
    assert_eq!(tcp.get("dataofs").unwrap(), Value::UInt(5));
    assert_eq!(tcp.get("flags").unwrap(), Value::UInt(0x018));
    assert_eq!(tcp.get("options").unwrap(), Value::Bytes(vec![]));

    let raw = p.layer("raw").unwrap();
    assert_eq!(raw.get("load").unwrap(), Value::Bytes(HTTP_REQUEST.to_vec()));
}

#[test]
fn reencoding_a_dissected_frame_is_byte_identical() {
    lancet::register_defaults().unwrap();
    let eth = PacketType::lookup("Ethernet").unwrap();

    let frame = http_frame();
    let p = decode(&eth, &frame);
    assert_eq!(encode(&p).unwrap(), frame);

    // Clearing the header checksum makes the encoder recompute it; the
    // capture carries a valid one, so the bytes still match.
    let mut q = p.clone();
    q.payload_mut().unwrap().unset("checksum").unwrap();
    assert_eq!(encode(&q).unwrap(), frame);
}

#[test]
fn ethernet_trailer_splits_into_padding() {
    lancet::register_defaults().unwrap();
    let eth = PacketType::lookup("Ethernet").unwrap();

    // A 46-byte frame padded to the 60-byte Ethernet minimum: the IPv4
    // total length exposes the last 14 bytes as trailer.
    let mut frame = hex::decode(concat!(
        "ffffffffffff00096b88f5c90800",
        "45000020000100004011f978c0a80001c0a80002",
        "12340035000c0000",
        "70696e67",
    ))
    .unwrap();
    frame.resize(60, 0);

    let p = decode(&eth, &frame);
    assert_eq!(p.summary(), "Ethernet / IPv4 / UDP / Raw / Padding");
    assert_eq!(
        p.layer("raw").unwrap().get("load").unwrap(),
        Value::Bytes(b"ping".to_vec())
    );
    assert_eq!(
        p.layer("pad").unwrap().get("load").unwrap(),
        Value::Bytes(vec![0u8; 14])
    );
    assert_eq!(encode(&p).unwrap(), frame);
}

#[test]
fn json_rendering_follows_the_layer_chain() {
    lancet::register_defaults().unwrap();
    let eth = PacketType::lookup("Ethernet").unwrap();

    let p = decode(&eth, &http_frame());
    let v = serde_json::to_value(&p).unwrap();

    assert_eq!(v["type"], "Ethernet");
    assert_eq!(v["fields"]["dst"], "00:e0:81:00:b0:28");
    assert_eq!(v["payload"]["type"], "IPv4");
    assert_eq!(v["payload"]["fields"]["ttl"], 128);
    assert_eq!(v["payload"]["payload"]["type"], "TCP");
    assert_eq!(
        v["payload"]["payload"]["payload"]["fields"]["load"],
        hex::encode(HTTP_REQUEST)
    );
}
