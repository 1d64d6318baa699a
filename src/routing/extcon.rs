//! Kernel extcon state parsing for the wired headphone jack.
//!
//! Each connector under `/sys/class/extcon` exposes a `state` file with
//! `CABLE=0/1` lines. The headphone and microphone cables together
//! distinguish a headset (with mic) from plain headphones.

use std::{fs, io, path::Path};

use crate::routing::OutputDeviceKind;

const CABLE_HEADPHONE: &str = "HEADPHONE";
const CABLE_MICROPHONE: &str = "MICROPHONE";

/// Jack state aggregated across all extcon connectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JackState {
   pub headphone: bool,
   pub microphone: bool,
}

impl JackState {
   /// The device type this state presents as, or `None` when unplugged.
   pub const fn kind(self) -> Option<OutputDeviceKind> {
      if !self.headphone {
         return None;
      }
      if self.microphone {
         Some(OutputDeviceKind::WiredHeadset)
      } else {
         Some(OutputDeviceKind::WiredHeadphones)
      }
   }
}

/// Parses the contents of one extcon `state` file.
pub fn parse_state(contents: &str) -> JackState {
   let mut state = JackState::default();

   for line in contents.lines() {
      let Some((cable, value)) = line.split_once('=') else {
         continue;
      };
      let attached = value.trim() != "0";

      match cable.trim() {
         CABLE_HEADPHONE => state.headphone |= attached,
         CABLE_MICROPHONE => state.microphone |= attached,
         _ => {},
      }
   }

   state
}

/// Reads and merges the jack state across every connector in `dir`.
///
/// Errors only when the directory itself cannot be read; unreadable
/// individual connectors are skipped.
pub fn read_jack_state(dir: &Path) -> io::Result<JackState> {
   let mut merged = JackState::default();

   for entry in fs::read_dir(dir)? {
      let Ok(entry) = entry else {
         continue;
      };
      let Ok(contents) = fs::read_to_string(entry.path().join("state")) else {
         continue;
      };
      let state = parse_state(&contents);
      merged.headphone |= state.headphone;
      merged.microphone |= state.microphone;
   }

   Ok(merged)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_headphone_only_is_headphones() {
      let state = parse_state("HEADPHONE=1\n");
      assert_eq!(state.kind(), Some(OutputDeviceKind::WiredHeadphones));
   }

   #[test]
   fn test_headphone_with_mic_is_headset() {
      let state = parse_state("HEADPHONE=1\nMICROPHONE=1\n");
      assert_eq!(state.kind(), Some(OutputDeviceKind::WiredHeadset));
   }

   #[test]
   fn test_detached_jack_has_no_kind() {
      let state = parse_state("HEADPHONE=0\nMICROPHONE=0\n");
      assert_eq!(state.kind(), None);

      // Mic alone is not an output accessory.
      let state = parse_state("MICROPHONE=1\n");
      assert_eq!(state.kind(), None);
   }

   #[test]
   fn test_unknown_cables_and_garbage_are_ignored() {
      let state = parse_state("USB=1\nnot a state line\nHEADPHONE=1\n");
      assert_eq!(state.kind(), Some(OutputDeviceKind::WiredHeadphones));
   }

   #[test]
   fn test_read_merges_connectors() {
      let tmp = tempfile::tempdir().unwrap();
      std::fs::create_dir(tmp.path().join("extcon0")).unwrap();
      std::fs::write(tmp.path().join("extcon0/state"), "HEADPHONE=1\n").unwrap();
      std::fs::create_dir(tmp.path().join("extcon1")).unwrap();
      std::fs::write(tmp.path().join("extcon1/state"), "MICROPHONE=1\n").unwrap();

      let state = read_jack_state(tmp.path()).unwrap();
      assert_eq!(state.kind(), Some(OutputDeviceKind::WiredHeadset));
   }

   #[test]
   fn test_missing_directory_is_an_error() {
      assert!(read_jack_state(Path::new("/nonexistent/extcon")).is_err());
   }
}
