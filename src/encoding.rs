//! Encoding and decoding definitions for the immune shape space alphabet.
//!
//! Gene sequences are written with the digits `1..=V` for residues, followed by a single isotype
//! tag (`M` for naive IgM, `G` for class-switched IgG).

/// Number of distinct residues in the shape space alphabet.
pub const VOCABULARY: usize = 4;

/// A single residue of a receptor or epitope sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Residue(u8);

/// Antibody isotype carried as trailing tag of a gene sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Isotype {
    #[default]
    IgM,
    IgG,
}

pub trait Symbol:
    std::marker::Sized
    + Copy
    + Clone
    + std::fmt::Debug
    + std::cmp::PartialEq
    + std::cmp::Eq
    + std::hash::Hash
    + std::fmt::Display
    + 'static
{
    const SIZE: usize;
    fn try_decode(s: &u8) -> Option<Self>;
    fn encode(&self) -> u8;
    fn index(&self) -> usize;
}

impl Residue {
    /// Create a residue from its index in `0..VOCABULARY`.
    ///
    /// Indices outside of the alphabet are wrapped.
    pub fn from_index(index: usize) -> Self {
        Residue((index % VOCABULARY) as u8)
    }
}

impl Symbol for Residue {
    const SIZE: usize = VOCABULARY;

    fn try_decode(s: &u8) -> Option<Self> {
        match s {
            // 1234 -> Residue
            0x31..=0x34 => Some(Residue(s - 0x31)),
            _ => None,
        }
    }

    fn encode(&self) -> u8 {
        self.0 + 0x31
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Symbol for Isotype {
    const SIZE: usize = 2;

    fn try_decode(s: &u8) -> Option<Self> {
        match s {
            0x4d | 0x6d => Some(Isotype::IgM),
            0x47 | 0x67 => Some(Isotype::IgG),
            _ => None,
        }
    }

    fn encode(&self) -> u8 {
        match self {
            Isotype::IgM => 0x4d,
            Isotype::IgG => 0x47,
        }
    }

    fn index(&self) -> usize {
        match self {
            Isotype::IgM => 0,
            Isotype::IgG => 1,
        }
    }
}

impl std::fmt::Display for Residue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.encode() as char)
    }
}

impl std::fmt::Display for Isotype {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.encode() as char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_encoding() {
        for index in 0..VOCABULARY {
            let residue = Residue::from_index(index);
            assert_eq!(residue.index(), index);
            assert_eq!(Residue::try_decode(&residue.encode()), Some(residue));
        }
        assert_eq!(Residue::try_decode(&b'1'), Some(Residue::from_index(0)));
        assert_eq!(Residue::try_decode(&b'4'), Some(Residue::from_index(3)));
        assert_eq!(Residue::try_decode(&b'0'), None);
        assert_eq!(Residue::try_decode(&b'5'), None);
    }

    #[test]
    fn isotype_encoding() {
        assert_eq!(Isotype::try_decode(&b'M'), Some(Isotype::IgM));
        assert_eq!(Isotype::try_decode(&b'G'), Some(Isotype::IgG));
        assert_eq!(Isotype::try_decode(&b'X'), None);
        assert_eq!(Isotype::IgG.to_string(), "G");
        assert_eq!(Isotype::default(), Isotype::IgM);
    }
}
