use rand::Rng;

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

// Generate a random shared token for clients to authenticate with
pub fn generate_token() -> String {
    encode_base58(rand::thread_rng().gen())
}

// Render a number in base58, least significant digit first
pub fn encode_base58(mut value: u64) -> String {
    let base = BASE58_ALPHABET.len() as u64;
    let mut digits = String::new();

    loop {
        digits.push(BASE58_ALPHABET[(value % base) as usize] as char);
        value /= base;
        if value == 0 {
            break;
        }
    }

    digits
}
