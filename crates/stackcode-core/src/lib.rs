//! stackcode-core — primitives partagées
//!
//! Fournit :
//! - la table d'opcodes de la VM à pile (`Opcode`, `OpKind`, `HAVE_ARGUMENT`, `EXTENDED_ARG`)
//! - les valeurs du pool de constantes (`ConstValue`) avec égalité stricte
//! - les métadonnées d'une unité de code (`CodeMeta`, `CodeFlags`, `Docstring`, `RawCode`)
//! - IO mémoire (little-endian) : `ByteWriter`, `ByteReader`
//! - Erreurs `CoreError` + alias `CoreResult<T>`
//!
//! Features :
//! - `serde` : derive (dé)sérialisation sur les valeurs et métadonnées

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Table d'opcodes (noms, classes d'opérande, constantes du codec).
pub mod opcode;
/// Valeurs du pool de constantes.
pub mod value;
/// Métadonnées et forme brute d'une unité de code.
pub mod unit;

pub use opcode::{OpKind, Opcode, ARG_MAX, EXTENDED_ARG, HAVE_ARGUMENT};
pub use unit::{CodeFlags, CodeMeta, Docstring, RawCode};
pub use value::ConstValue;

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs de bas niveau communes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Fin de buffer inattendue.
    #[error("unexpected EOF: need {needed} bytes at {at}")]
    UnexpectedEof {
        /// Nombre d'octets manquants.
        needed: usize,
        /// Offset où l'erreur s'est produite.
        at: usize,
    },
    /// Octet qui ne correspond à aucun opcode connu.
    #[error("unknown opcode 0x{byte:02X} at offset {at}")]
    UnknownOpcode {
        /// Octet brut lu.
        byte: u8,
        /// Offset de l'octet.
        at: usize,
    },
    /// Nom d'opcode inconnu.
    #[error("unknown operation name `{0}`")]
    UnknownName(String),
}

/* ─────────────────────────── Byte Writer (LE) ─────────────────────────── */

/// Buffer d'écriture (croît automatiquement).
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Crée un writer vide.
    pub fn new() -> Self { Self { buf: Vec::new() } }
    /// Crée un writer avec une capacité initiale.
    pub fn with_capacity(cap: usize) -> Self { Self { buf: Vec::with_capacity(cap) } }
    /// Nombre d'octets écrits.
    pub fn len(&self) -> usize { self.buf.len() }
    /// Vrai si rien n'a été écrit.
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    /// Accès en lecture au contenu.
    pub fn as_slice(&self) -> &[u8] { &self.buf }
    /// Récupère le buffer (consomme).
    pub fn into_vec(self) -> Vec<u8> { self.buf }
    /// Ajoute des octets bruts.
    pub fn write_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }
    /// Écrit un octet.
    pub fn write_u8(&mut self, v: u8) { self.buf.push(v); }
    /// Écrit un octet signé (complément à deux).
    pub fn write_i8(&mut self, v: i8) { self.buf.push(v.to_le_bytes()[0]); }
    /// Écrit un u16 little-endian.
    pub fn write_u16_le(&mut self, v: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }
    /// Écrit un u32 little-endian.
    pub fn write_u32_le(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }
}

/* ─────────────────────────── Byte Reader (LE) ─────────────────────────── */

/// Lecteur séquentiel sur un slice d'octets (helpers LE).
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    /// Construit un lecteur au début du slice.
    pub fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }
    /// Construit un lecteur positionné à `off`.
    pub fn at(data: &'a [u8], off: usize) -> Self { Self { data, off } }
    /// Offset courant.
    pub fn offset(&self) -> usize { self.off }
    /// Taille restante.
    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.off) }

    /// Lit `n` octets (ou erreur si EOF).
    pub fn read_bytes(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CoreError::UnexpectedEof { needed: n - self.remaining(), at: self.off });
        }
        let start = self.off;
        self.off += n;
        Ok(&self.data[start..self.off])
    }

    /// Lit un octet.
    pub fn read_u8(&mut self) -> CoreResult<u8> { Ok(self.read_bytes(1)?[0]) }

    /// Lit un octet signé.
    pub fn read_i8(&mut self) -> CoreResult<i8> { Ok(i8::from_le_bytes([self.read_u8()?])) }

    /// Lit un u16 LE.
    pub fn read_u16_le(&mut self) -> CoreResult<u16> { Ok(LittleEndian::read_u16(self.read_bytes(2)?)) }

    /// Lit un u32 LE.
    pub fn read_u32_le(&mut self) -> CoreResult<u32> { Ok(LittleEndian::read_u32(self.read_bytes(4)?)) }
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        ByteReader, ByteWriter, CodeFlags, CodeMeta, ConstValue, CoreError, CoreResult, Docstring,
        OpKind, Opcode, RawCode, ARG_MAX, EXTENDED_ARG, HAVE_ARGUMENT,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn writer_reader_le() -> CoreResult<()> {
        let mut w = ByteWriter::new();
        w.write_u8(0x64);
        w.write_u16_le(0xBEEF);
        w.write_i8(-127);
        w.write_u32_le(0xDEAD_BEEF);

        assert_eq!(&w.as_slice()[..4], &[0x64, 0xEF, 0xBE, 0x81]);

        let mut r = ByteReader::new(w.as_slice());
        assert_eq!(r.read_u8()?, 0x64);
        assert_eq!(r.read_u16_le()?, 0xBEEF);
        assert_eq!(r.read_i8()?, -127);
        assert_eq!(r.read_u32_le()?, 0xDEAD_BEEF);
        assert_eq!(r.remaining(), 0);
        Ok(())
    }

    #[test]
    fn reader_reports_missing_bytes() {
        let data = [0x64, 0x01];
        let mut r = ByteReader::at(&data, 1);
        assert_eq!(r.read_u16_le(), Err(CoreError::UnexpectedEof { needed: 1, at: 1 }));
    }
}
