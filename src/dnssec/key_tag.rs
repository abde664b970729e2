/// Calculate the key tag for a DNSKEY record (RFC 4034 Appendix B)
pub fn calculate_key_tag(flags: u16, protocol: u8, algorithm: u8, public_key: &[u8]) -> u16 {
    // RSA/MD5 keys use the third and second to last octets of the modulus
    if algorithm == 1 {
        if public_key.len() < 3 {
            return 0;
        }
        let end = public_key.len();
        return u16::from_be_bytes([public_key[end - 3], public_key[end - 2]]);
    }

    let header = [
        (flags >> 8) as u8,
        (flags & 0xff) as u8,
        protocol,
        algorithm,
    ];

    let mut accumulator: u32 = header
        .iter()
        .chain(public_key.iter())
        .enumerate()
        .map(|(i, &byte)| {
            if i % 2 == 0 {
                u32::from(byte) << 8
            } else {
                u32::from(byte)
            }
        })
        .sum();

    accumulator += (accumulator >> 16) & 0xFFFF;
    (accumulator & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    #[test]
    fn test_key_tag_calculation() {
        let flags = 0x0101; // KSK
        let protocol = 3;
        let algorithm = 5; // RSASHA1
        let public_key = hex::decode(
            "030101a80020a95566ba42e886bb804cda84e47ef56dbd7aec612615552cec906d3e9b72dc4f90d3fc09b8e9d0ff2ae8ee5ed8cd61d7622c39ee2d76a2153bc0ac8b9e254125c46e0a224507fb358d7f6b5d7a42f75e60b9748e7c0747e2447f4bd7d10ca24bb1498de34a504406bbeb3b041fe48d0ad2b1de5adadb87d0c8824e7cc4dc3e5b7f0b3e8ac72c3d3d8aa7251abcaad82ad5ececed8cd83825d19ffd95e93bca729fdd88901b20fc598fb6a0779ddfa95e3e42ca9d0a7739d3c4ad3a7a5a30b3c60a73a6f09fdb812746e0d69edfba06754465f2e1dd5e3802e6d05bd6148e38fd8ca1632b71f6559fe9b6e18d73c5a750e3e2f2f205972e7b28ae04ddae5e27915a08d217db5ce090c119d23f79fb"
        ).unwrap();

        assert_eq!(calculate_key_tag(flags, protocol, algorithm, &public_key), 55495);
    }

    #[test]
    fn test_key_tag_rfc4034_example() {
        // dskey.example.com DNSKEY from RFC 4034 section 5.4
        let public_key = STANDARD
            .decode("AQOeiiR0GOMYkDshWoSKz9XzfwJr1AYtsmx3TGkJaNXVbfi/2pHm822aJ5iI9BMzNXxeYCmZDRD99WYwYqUSdjMmmAphXdvxegXd/M5+X7OrzKBaMbCVdFLUUh6DhweJBjEVv5f2wwjM9XzcnOf+EPbtG9DMBmADjFDc2w/rljwvFw==")
            .unwrap();
        assert_eq!(calculate_key_tag(256, 3, 5, &public_key), 60485);
    }

    #[test]
    fn test_key_tag_rsamd5() {
        let public_key = vec![0x12, 0x34, 0x56, 0x78];
        assert_eq!(calculate_key_tag(0x0101, 3, 1, &public_key), 0x3456);
    }
}
