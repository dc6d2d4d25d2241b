//! Deterministic hashing used to derive independent random streams from sample coordinates.

/// MurmurHash64A over a byte slice.
pub fn murmur_hash64a(key: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4_a793_5bd1_e995;
    const R: u32 = 47;

    let mut h = seed ^ (key.len() as u64).wrapping_mul(M);

    let mut chunks = key.chunks_exact(8);
    for chunk in &mut chunks {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(chunk);
        let mut k = u64::from_le_bytes(bytes);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate() {
            h ^= (b as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

/// Scrambles the bits of a 64-bit value.
#[inline]
pub fn mix_bits(mut v: u64) -> u64 {
    v ^= v >> 31;
    v = v.wrapping_mul(0x7fb5_d329_728e_a185);
    v ^= v >> 27;
    v = v.wrapping_mul(0x81da_def4_bc2d_d44d);
    v ^= v >> 33;
    v
}

/// Hashes a list of integer values.
pub fn hash_values(values: &[u64]) -> u64 {
    // the samplers hash a handful of values per draw, keep those off the heap
    const STACK_VALUES: usize = 8;
    if values.len() <= STACK_VALUES {
        let mut buf = [0u8; STACK_VALUES * 8];
        for (chunk, v) in buf.chunks_exact_mut(8).zip(values) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        return murmur_hash64a(&buf[..values.len() * 8], 0);
    }

    let mut buf = Vec::with_capacity(values.len() * 8);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    murmur_hash64a(&buf, 0)
}

/// Hashes a list of floats by their bit patterns.
pub fn hash_floats(values: &[f32]) -> u64 {
    let mut buf = Vec::with_capacity(values.len() * 4);
    for v in values {
        buf.extend_from_slice(&v.to_bits().to_le_bytes());
    }
    murmur_hash64a(&buf, 0)
}

/// Maps index `i` in `[0, n)` to a pseudo-random permutation of that range selected by `seed`.
pub fn permutation_element(mut i: u32, n: u32, seed: u32) -> u32 {
    let p = seed;
    let mut w = n.wrapping_sub(1);
    w |= w >> 1;
    w |= w >> 2;
    w |= w >> 4;
    w |= w >> 8;
    w |= w >> 16;
    loop {
        i ^= p;
        i = i.wrapping_mul(0xe170_893d);
        i ^= p >> 16;
        i ^= (i & w) >> 4;
        i ^= p >> 8;
        i = i.wrapping_mul(0x0929_eb3f);
        i ^= p >> 23;
        i ^= (i & w) >> 1;
        i = i.wrapping_mul(1 | p >> 27);
        i = i.wrapping_mul(0x6935_fa69);
        i ^= (i & w) >> 11;
        i = i.wrapping_mul(0x74dc_b303);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0x9e50_1cc3);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0xc860_a3df);
        i &= w;
        i ^= i >> 5;
        if i < n {
            break;
        }
    }
    ((i as u64 + p as u64) % n as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_values(&[1, 2, 3]), hash_values(&[1, 2, 3]));
        assert_ne!(hash_values(&[1, 2, 3]), hash_values(&[1, 2, 4]));
        assert_ne!(hash_floats(&[0.5, 0.25]), hash_floats(&[0.25, 0.5]));
    }

    #[test]
    fn test_tail_bytes_contribute() {
        assert_ne!(murmur_hash64a(b"abcdefghi", 0), murmur_hash64a(b"abcdefghj", 0));
    }

    #[test]
    fn test_permutation_is_bijection() {
        for &n in &[1u32, 2, 7, 16, 33] {
            let mut seen = vec![false; n as usize];
            for i in 0..n {
                let j = permutation_element(i, n, 0x1234_5678);
                assert!(j < n);
                assert!(!seen[j as usize]);
                seen[j as usize] = true;
            }
        }
    }
}
