// Poseidon2 tweakable hash over the KoalaBear field

use std::sync::OnceLock;

use p3_field::PrimeField32;
use p3_koala_bear::{
    default_koalabear_poseidon2_16, default_koalabear_poseidon2_24, KoalaBear, Poseidon2KoalaBear,
};
use p3_symmetric::Permutation;

use crate::symmetric::{
    Tweak, TweakableHash, MESSAGE_DIGEST_LEN, MESSAGE_HASH_LEN, PRF_OUTPUT_LEN, RAND_LEN,
};

/// KoalaBear prime `2^31 - 2^24 + 1`.
pub const KOALABEAR_MODULUS: u32 = 0x7f00_0001;
/// Number of field elements in a hash output.
pub const POSEIDON_HASH_LEN_FE: usize = 8;
/// Number of field elements in the public parameter.
pub const POSEIDON_PARAMETER_LEN_FE: usize = 5;
/// Number of field elements a tweak is decomposed into.
pub const POSEIDON_TWEAK_LEN_FE: usize = 3;
/// Bytes per serialized field element.
pub const POSEIDON_FE_BYTES: usize = 4;

const RATE: usize = 16;
const CAPACITY: usize = 8;
const WIDTH: usize = RATE + CAPACITY;
const BYTES_PER_PACKED_FE: usize = 3;
const MESSAGE_SEPARATOR: u32 = 0x6d7367;
const MESSAGE_HASH_LEN_FE: usize = MESSAGE_HASH_LEN.div_ceil(BYTES_PER_PACKED_FE);

fn permutation_16() -> &'static Poseidon2KoalaBear<16> {
    static PERM: OnceLock<Poseidon2KoalaBear<16>> = OnceLock::new();
    PERM.get_or_init(default_koalabear_poseidon2_16)
}

fn permutation_24() -> &'static Poseidon2KoalaBear<24> {
    static PERM: OnceLock<Poseidon2KoalaBear<24>> = OnceLock::new();
    PERM.get_or_init(default_koalabear_poseidon2_24)
}

fn fe(value: u32) -> KoalaBear {
    KoalaBear::new(value % KOALABEAR_MODULUS)
}

fn tweak_elements(tweak: &Tweak) -> [KoalaBear; POSEIDON_TWEAK_LEN_FE] {
    let p = KOALABEAR_MODULUS as u128;
    let mut acc = tweak.to_u128();
    let mut out = [KoalaBear::new(0); POSEIDON_TWEAK_LEN_FE];
    for limb in out.iter_mut() {
        *limb = KoalaBear::new((acc % p) as u32);
        acc /= p;
    }
    out
}

/// Packs bytes three at a time into field elements; every value stays below the modulus.
fn pack_bytes(bytes: &[u8]) -> Vec<KoalaBear> {
    bytes
        .chunks(BYTES_PER_PACKED_FE)
        .map(|chunk| {
            let value = chunk
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, b)| acc | (*b as u32) << (8 * i));
            KoalaBear::new(value)
        })
        .collect()
}

fn prf_to_elements<const N: usize>(bytes: &[u8; PRF_OUTPUT_LEN]) -> [u32; N] {
    let mut out = [0u32; N];
    for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *slot = (u64::from_le_bytes(word) % KOALABEAR_MODULUS as u64) as u32;
    }
    out
}

/// `perm(state) + state`.
fn compress<const W: usize, P>(perm: &P, state: [KoalaBear; W]) -> [KoalaBear; W]
where
    P: Permutation<[KoalaBear; W]>,
{
    let mut out = perm.permute(state);
    for (o, s) in out.iter_mut().zip(state.iter()) {
        *o += *s;
    }
    out
}

/// Width-24 sponge: rate 16, capacity preloaded by the caller.
fn sponge(capacity: [KoalaBear; CAPACITY], input: &[KoalaBear], out_len: usize) -> Vec<KoalaBear> {
    let perm = permutation_24();
    let mut state = [KoalaBear::new(0); WIDTH];
    state[RATE..].copy_from_slice(&capacity);

    for block in input.chunks(RATE) {
        for (s, x) in state.iter_mut().zip(block.iter()) {
            *s += *x;
        }
        state = perm.permute(state);
    }

    state[..out_len].to_vec()
}

/// Poseidon2 over KoalaBear.
///
/// One input is compressed with the width-16 permutation, two inputs with the
/// width-24 permutation, and longer inputs (tree leaves) go through a width-24
/// sponge whose capacity holds the parameter and the tweak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Poseidon2TweakHash;

impl Poseidon2TweakHash {
    fn to_domain(elements: &[KoalaBear]) -> [u32; POSEIDON_HASH_LEN_FE] {
        let mut out = [0u32; POSEIDON_HASH_LEN_FE];
        for (o, e) in out.iter_mut().zip(elements.iter()) {
            *o = e.as_canonical_u32();
        }
        out
    }
}

impl TweakableHash for Poseidon2TweakHash {
    type Parameter = [u32; POSEIDON_PARAMETER_LEN_FE];
    type Domain = [u32; POSEIDON_HASH_LEN_FE];

    const NAME: &'static str = "Poseidon2-KoalaBear";
    const DOMAIN_BYTES: usize = POSEIDON_HASH_LEN_FE * POSEIDON_FE_BYTES;
    const PARAMETER_BYTES: usize = POSEIDON_PARAMETER_LEN_FE * POSEIDON_FE_BYTES;

    fn parameter_from_prf(bytes: &[u8; PRF_OUTPUT_LEN]) -> Self::Parameter {
        prf_to_elements(bytes)
    }

    fn domain_from_prf(bytes: &[u8; PRF_OUTPUT_LEN]) -> Self::Domain {
        prf_to_elements(bytes)
    }

    fn apply(parameter: &Self::Parameter, tweak: &Tweak, inputs: &[Self::Domain]) -> Self::Domain {
        let tweak_fe = tweak_elements(tweak);
        let header = parameter.iter().copied().map(fe).chain(tweak_fe);

        match inputs {
            [single] => {
                let mut state = [KoalaBear::new(0); 16];
                for (s, x) in state
                    .iter_mut()
                    .zip(header.chain(single.iter().copied().map(fe)))
                {
                    *s = x;
                }
                Self::to_domain(&compress(permutation_16(), state))
            }
            [left, right] => {
                let mut state = [KoalaBear::new(0); WIDTH];
                let body = left.iter().chain(right.iter()).copied().map(fe);
                for (s, x) in state.iter_mut().zip(header.chain(body)) {
                    *s = x;
                }
                Self::to_domain(&compress(permutation_24(), state))
            }
            _ => {
                let mut capacity = [KoalaBear::new(0); CAPACITY];
                for (c, x) in capacity.iter_mut().zip(header) {
                    *c = x;
                }
                let mut flat: Vec<KoalaBear> = inputs
                    .iter()
                    .flat_map(|d| d.iter().copied().map(fe))
                    .collect();
                flat.push(fe(inputs.len() as u32));
                Self::to_domain(&sponge(capacity, &flat, POSEIDON_HASH_LEN_FE))
            }
        }
    }

    fn message_hash(
        parameter: &Self::Parameter,
        epoch: u64,
        rho: &[u8; RAND_LEN],
        digest: &[u8; MESSAGE_DIGEST_LEN],
    ) -> [u8; MESSAGE_HASH_LEN] {
        let mut capacity = [KoalaBear::new(0); CAPACITY];
        capacity[0] = KoalaBear::new(MESSAGE_SEPARATOR);

        let mut input = pack_bytes(rho);
        input.extend(parameter.iter().copied().map(fe));
        input.extend(tweak_elements(&Tweak::Message { epoch }));
        input.extend(pack_bytes(digest));

        let squeezed = sponge(capacity, &input, MESSAGE_HASH_LEN_FE);
        let mut bytes = Vec::with_capacity(MESSAGE_HASH_LEN_FE * BYTES_PER_PACKED_FE);
        for element in squeezed {
            let v = element.as_canonical_u32();
            bytes.extend_from_slice(&v.to_le_bytes()[..BYTES_PER_PACKED_FE]);
        }

        let mut out = [0u8; MESSAGE_HASH_LEN];
        out.copy_from_slice(&bytes[..MESSAGE_HASH_LEN]);
        out
    }

    fn is_canonical_domain(domain: &Self::Domain) -> bool {
        domain.iter().all(|v| *v < KOALABEAR_MODULUS)
    }

    fn is_canonical_parameter(parameter: &Self::Parameter) -> bool {
        parameter.iter().all(|v| *v < KOALABEAR_MODULUS)
    }
}
