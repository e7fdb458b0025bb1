//! Residue alphabets.

/// Sequence alphabet of a motif and the sequences scanned with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Dna,
    Protein,
}

const DNA_CORE: &[u8] = b"ACGT";
const DNA_AMBIGUOUS: &[u8] = b"BDHKMNRSVWY";
const PROTEIN_CORE: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";
const PROTEIN_AMBIGUOUS: &[u8] = b"BJOUXZ";

impl Alphabet {
    /// Guess the alphabet from a letter count (4 for DNA, 20 for protein).
    pub fn from_size(size: usize) -> Option<Self> {
        match size {
            4 => Some(Alphabet::Dna),
            20 => Some(Alphabet::Protein),
            _ => None,
        }
    }

    /// Parse the symbol list of a motif file `ALPHABET=` line.
    pub fn from_letters(letters: &str) -> Option<Self> {
        let upper = letters.trim().to_ascii_uppercase();
        if upper.as_bytes() == DNA_CORE {
            Some(Alphabet::Dna)
        } else if upper.as_bytes() == PROTEIN_CORE {
            Some(Alphabet::Protein)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Alphabet::Dna => "DNA",
            Alphabet::Protein => "protein",
        }
    }

    /// Core letters, in matrix column order.
    pub fn letters(self) -> &'static [u8] {
        match self {
            Alphabet::Dna => DNA_CORE,
            Alphabet::Protein => PROTEIN_CORE,
        }
    }

    pub fn size(self) -> usize {
        self.letters().len()
    }

    pub fn wildcard(self) -> u8 {
        match self {
            Alphabet::Dna => b'N',
            Alphabet::Protein => b'X',
        }
    }

    pub fn is_complementable(self) -> bool {
        self == Alphabet::Dna
    }

    /// Column index of a core letter; ambiguity codes and unknown bytes
    /// have no index.
    pub fn index(self, residue: u8) -> Option<usize> {
        let upper = residue.to_ascii_uppercase();
        match self {
            Alphabet::Dna => match upper {
                b'A' => Some(0),
                b'C' => Some(1),
                b'G' => Some(2),
                b'T' => Some(3),
                _ => None,
            },
            Alphabet::Protein => PROTEIN_CORE.iter().position(|&b| b == upper),
        }
    }

    /// True for core letters and recognised ambiguity codes.
    pub fn is_known(self, residue: u8) -> bool {
        let upper = residue.to_ascii_uppercase();
        let ambiguous = match self {
            Alphabet::Dna => DNA_AMBIGUOUS,
            Alphabet::Protein => PROTEIN_AMBIGUOUS,
        };
        self.index(upper).is_some() || ambiguous.contains(&upper)
    }

    /// Index of the complementary core letter (DNA only).
    pub fn complement_index(self, index: usize) -> usize {
        match self {
            Alphabet::Dna => 3 - index,
            Alphabet::Protein => index,
        }
    }
}

/// Complement a DNA residue, including IUPAC ambiguity codes.
pub fn complement(residue: u8) -> u8 {
    match residue {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        other => other,
    }
}

/// Reverse-complement `seq` in place.
pub fn reverse_complement(seq: &mut [u8]) {
    seq.reverse();
    for b in seq.iter_mut() {
        *b = complement(*b);
    }
}
