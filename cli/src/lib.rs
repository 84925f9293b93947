//! charm-cli – interaktiver Kommandozeilen-Client
//!
//! Liest Befehle zeilenweise von stdin und gibt jedes Ereignis des
//! Charm-Clients als eine Zeile auf stdout aus.

pub mod auffrischung;
pub mod ausgabe;
pub mod eingabe;
pub mod sitzung;
