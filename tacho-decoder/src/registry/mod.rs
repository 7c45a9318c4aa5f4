//! Tag registry
//!
//! Static tables describing every tag the decoder understands, indexed by
//! file kind, generation and tag value. The card and VU scanners consult the
//! registry and then act on the descriptor they get back; nothing else in the
//! crate hard-codes record layouts by tag.

pub mod card;
pub mod vu;

use crate::types::{FileKind, Generation};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub use card::CardRecord;
pub use vu::VuTransfer;

/// How the payload width of an element is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Exactly this many bytes
    Fixed(usize),
    /// Whatever length the element header declares
    LengthPrefixed,
    /// A `header` (newest-record pointer, or nothing) followed by whole
    /// records of `record` bytes
    Repeated { header: usize, record: usize },
    /// Derived from counts, card type bytes or record array headers embedded
    /// in the payload itself
    Computed,
}

impl PayloadShape {
    /// Check a declared payload length against the shape
    pub fn accepts(&self, length: usize) -> bool {
        match *self {
            PayloadShape::Fixed(size) => length == size,
            PayloadShape::Repeated { header, record } => {
                length >= header && record > 0 && (length - header) % record == 0
            }
            PayloadShape::LengthPrefixed | PayloadShape::Computed => true,
        }
    }
}

/// What a descriptor decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Card(CardRecord),
    Vu(VuTransfer),
}

/// Everything the scanners need to know about one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub file: FileKind,
    pub tag: u16,
    /// Field name without the generation suffix
    pub name: &'static str,
    /// Generations under which this descriptor is active
    pub generations: &'static [Generation],
    pub shape: PayloadShape,
    pub record: RecordKind,
    /// Whether a signature is expected to follow the data
    pub signed: bool,
}

impl RecordDescriptor {
    /// Generation-qualified field name, e.g. `vehicles_used_2`
    pub fn field_name(&self, generation: Generation) -> String {
        format!("{}{}", self.name, generation.field_suffix())
    }
}

type Key = (FileKind, Generation, u16);

/// Lookup index over the static descriptor tables
pub struct TagRegistry {
    index: HashMap<Key, &'static RecordDescriptor>,
}

static REGISTRY: Lazy<TagRegistry> = Lazy::new(|| {
    TagRegistry::from_tables(&[card::DESCRIPTORS, vu::DESCRIPTORS])
});

impl TagRegistry {
    /// The process-wide registry built from the static tables
    pub fn global() -> &'static TagRegistry {
        &REGISTRY
    }

    fn from_tables(tables: &[&'static [RecordDescriptor]]) -> Self {
        let mut index = HashMap::new();
        for descriptor in tables.iter().flat_map(|table| table.iter()) {
            for &generation in descriptor.generations {
                let key = (descriptor.file, generation, descriptor.tag);
                if let Some(previous) = index.insert(key, descriptor) {
                    log::error!(
                        "Duplicate descriptor for {} tag 0x{:04X} under {}: {} replaced by {}",
                        descriptor.file,
                        descriptor.tag,
                        generation,
                        previous.name,
                        descriptor.name
                    );
                }
            }
        }
        log::debug!("Tag registry built with {} entries", index.len());
        Self { index }
    }

    /// Resolve a tag for the given file kind and generation
    pub fn lookup(
        &self,
        file: FileKind,
        generation: Generation,
        tag: u16,
    ) -> Option<&'static RecordDescriptor> {
        self.index.get(&(file, generation, tag)).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Tracks the highest generation evidenced so far in a file
///
/// Starts out unknown and only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationLatch {
    current: Option<Generation>,
}

impl GenerationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Generation> {
        self.current
    }

    /// Move the latch to `generation` unless it is already at or past it
    pub fn raise(&mut self, generation: Generation) {
        if self.current.map_or(true, |current| generation > current) {
            log::debug!("Generation latched to {}", generation);
            self.current = Some(generation);
        }
    }

    /// Account for a card data element carrying the given appendix family
    pub fn observe_card(&mut self, fid: u16, family: Generation) {
        match fid {
            card::EF_APPLICATION_IDENTIFICATION => self.raise(family.key_family()),
            card::EF_APPLICATION_IDENTIFICATION_V2 => self.raise(Generation::Gen2V2),
            _ => {}
        }
    }

    /// Generation to resolve a card element of the given appendix family under
    pub fn card_generation(&self, family: Generation) -> Generation {
        if family.is_second() {
            self.current
                .map_or(Generation::Gen2V1, |current| current.max(Generation::Gen2V1))
        } else {
            Generation::Gen1
        }
    }

    /// Account for a VU transfer tag and return the generation to resolve it under
    pub fn observe_vu(&mut self, tag: u16) -> Generation {
        let generation = vu::generation_of(tag);
        if let Some(generation) = generation {
            self.raise(generation);
        }
        generation
            .or(self.current)
            .unwrap_or(Generation::Gen1)
    }
}
