
pub mod geometric;

pub use geometric::*;

/// A circular buffer of path fragments, one per recorded branch.
///
/// Index 0 always refers to the most recently inserted fragment; index 'n'
/// refers to the fragment inserted 'n' branches ago.
#[derive(Clone, Debug)]
pub struct PathHistoryRegister {
    data: Vec<u32>,
    ptr: usize,
}

// NOTE: Fragments are printed from the most-recent (leftmost) to the oldest.
impl std::fmt::Display for PathHistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for n in 0..self.len() {
            if n != 0 { write!(f, " ")?; }
            write!(f, "{:08x}", self[n])?;
        }
        Ok(())
    }
}

impl PathHistoryRegister {
    /// Create a register holding 'len' fragments.
    /// All fragments in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0);
        Self {
            data: vec![0; len],
            ptr: 0,
        }
    }

    pub fn len(&self) -> usize { self.data.len() }

    /// Record a new fragment, discarding the oldest one.
    pub fn insert(&mut self, val: u32) {
        self.ptr = if self.ptr == 0 { self.len() - 1 } else { self.ptr - 1 };
        self.data[self.ptr] = val;
    }

    /// Return the fragment inserted 'n' branches ago.
    pub fn get(&self, n: usize) -> u32 {
        debug_assert!(n < self.len());
        let mut k = self.ptr + n;
        if k >= self.len() {
            k -= self.len();
        }
        self.data[k]
    }
}

impl std::ops::Index<usize> for PathHistoryRegister {
    type Output = u32;
    fn index(&self, n: usize) -> &u32 {
        debug_assert!(n < self.len());
        &self.data[(self.ptr + n) % self.len()]
    }
}


/// Rotate the low 'width' bits of 'x' left by 'm' bits.
///
/// Bits of 'x' above 'width' must be zero.
pub fn rotate_left_within(x: u32, m: u32, width: u32) -> u32 {
    debug_assert!(width > 0 && width < 32);
    debug_assert!(m < width);
    debug_assert!(x >> width == 0);
    let mask = (1u32 << width) - 1;
    ((x << m) | (x >> (width - m))) & mask
}

/// A circular shift register used to track folded path history.
///
/// This folds the most recent 'original_length' path fragments into
/// 'compressed_length' bits without reading all of them on each update:
/// every update rotates the register by one bit, injects the low bits of
/// the newest fragment at bit 0, and cancels out the fragment leaving the
/// window (which has been rotated to the 'outpoint' by then).
///
/// The result is always equal to [fold_window] over the same fragments.
#[derive(Clone, Debug)]
pub struct FoldedHistoryRegister {
    /// The folded value
    comp: u32,

    /// Number of fragments covered by the fold
    original_length: usize,

    /// The size of the output [in bits]
    compressed_length: u32,

    /// Number of low-order bits taken from each fragment
    injected_bits: u32,

    /// Bit position where the oldest fragment's contribution lands
    outpoint: u32,

    /// Mask selecting the injected bits of a fragment
    inject_mask: u32,
}
impl FoldedHistoryRegister {
    pub fn new(original_length: usize, compressed_length: u32,
        injected_bits: u32) -> Self
    {
        assert!(compressed_length > 0 && compressed_length < 32);
        assert!(injected_bits <= compressed_length);
        Self {
            comp: 0,
            original_length,
            compressed_length,
            injected_bits,
            outpoint: (original_length % compressed_length as usize) as u32,
            inject_mask: ((1u64 << injected_bits) - 1) as u32,
        }
    }

    /// Return the folded history.
    pub fn output(&self) -> u32 { self.comp }

    pub fn original_length(&self) -> usize { self.original_length }
    pub fn compressed_length(&self) -> u32 { self.compressed_length }
    pub fn injected_bits(&self) -> u32 { self.injected_bits }

    /// Clear the folded history.
    pub fn reset(&mut self) { self.comp = 0; }

    /// Using the [PathHistoryRegister] this register follows, fold in the
    /// newest fragment. Must be called exactly once after every insertion.
    pub fn update(&mut self, ph: &PathHistoryRegister) {
        debug_assert!(ph.len() > self.original_length);
        let inbits  = ph.get(0) & self.inject_mask;
        let outbits = rotate_left_within(
            ph.get(self.original_length) & self.inject_mask,
            self.outpoint,
            self.compressed_length,
        );
        self.comp = rotate_left_within(self.comp, 1 % self.compressed_length,
            self.compressed_length
        );
        self.comp ^= inbits ^ outbits;
    }
}

/// Fold a window of path fragments from scratch.
///
/// 'fragments' lists the most recent fragment first. Only the first
/// 'original_length' fragments contribute: the fragment at age 'k' is
/// rotated left by 'k mod compressed_length' bits.
pub fn fold_window(fragments: &[u32], original_length: usize,
    compressed_length: u32, injected_bits: u32) -> u32
{
    let mask = ((1u64 << injected_bits) - 1) as u32;
    fragments.iter().take(original_length).enumerate()
        .fold(0, |acc, (age, frag)| {
            let rot = (age % compressed_length as usize) as u32;
            acc ^ rotate_left_within(frag & mask, rot, compressed_length)
        })
}


#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn path_history_index_zero_is_newest() {
        let mut ph = PathHistoryRegister::new(4);
        for v in 1..=6 {
            ph.insert(v);
        }
        assert_eq!(ph[0], 6);
        assert_eq!(ph.get(1), 5);
        assert_eq!(ph[3], 3);
        assert_eq!(ph.len(), 4);
        assert_eq!(format!("{}", ph),
            "00000006 00000005 00000004 00000003");
    }

    #[test]
    fn rotate_wraps_within_width() {
        assert_eq!(rotate_left_within(0b1000, 1, 4), 0b0001);
        assert_eq!(rotate_left_within(0b0110, 2, 4), 0b1001);
        assert_eq!(rotate_left_within(0b1011, 0, 4), 0b1011);
    }

    #[test]
    fn folded_history_forgets_old_fragments() {
        let mut ph = PathHistoryRegister::new(9);
        let mut fh = FoldedHistoryRegister::new(8, 5, 5);
        for v in [0x1f, 0x3, 0x11, 0x7] {
            ph.insert(v);
            fh.update(&ph);
        }
        // Push the interesting fragments out of the window
        for _ in 0..8 {
            ph.insert(0);
            fh.update(&ph);
        }
        assert_eq!(fh.output(), 0);
    }

    fn fold_params() -> impl Strategy<Value = (usize, u32, u32)> {
        (1u32..20).prop_flat_map(|clen| {
            (1usize..64, Just(clen), 0..=clen)
        })
    }

    proptest! {
        #[test]
        fn incremental_fold_matches_window_fold(
            (olen, clen, nbits) in fold_params(),
            frags in prop::collection::vec(any::<u32>(), 0..200),
        ) {
            let mut ph = PathHistoryRegister::new(olen + 1);
            let mut fh = FoldedHistoryRegister::new(olen, clen, nbits);
            let mut window: Vec<u32> = Vec::new();
            for f in frags {
                ph.insert(f);
                fh.update(&ph);
                window.insert(0, f);
                let expected = fold_window(&window, olen, clen, nbits);
                prop_assert_eq!(fh.output(), expected);
                prop_assert!(fh.output() >> clen == 0);
            }
        }
    }
}
