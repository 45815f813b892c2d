//! Modulation value providers
//!
//! Small pluggable sources of control values (0..1-ish floats) that feed
//! external modulation busses. Providers are registered in a flat registry
//! keyed by a stable FourCC identifier, each entry carrying a display name,
//! a capability-flag set and a constructor; consumers only ever see the
//! narrow [`Provider`] interface.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::MixerAtomics;

/// Capability flags describing which [`ProviderInput`] fields a provider
/// consumes and whether its output supports range remapping
pub type AbilityFlags = u32;

pub const ABILITY_NOTHING_SPECIAL: AbilityFlags = 0;
pub const ABILITY_USES_VALUE: AbilityFlags = 1 << 0;
pub const ABILITY_USES_TIME: AbilityFlags = 1 << 1;
pub const ABILITY_USES_BUS1: AbilityFlags = 1 << 2;
pub const ABILITY_USES_BUS2: AbilityFlags = 1 << 3;
pub const ABILITY_USES_REMAPPING: AbilityFlags = 1 << 4;

/// Stable FourCC provider identifier
pub const fn provider_id(tag: [u8; 4]) -> u32 {
    u32::from_le_bytes(tag)
}

/// Per-evaluation inputs offered to a provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderInput {
    /// Raw modulation value from the host bus
    pub value: f32,
    /// Wall time in seconds
    pub time: f32,
    /// Output of bus 1, or -1 if unpatched
    pub bus1: f32,
    /// Output of bus 2, or -1 if unpatched
    pub bus2: f32,
}

impl Default for ProviderInput {
    fn default() -> Self {
        Self {
            value: 0.0,
            time: 0.0,
            bus1: -1.0,
            bus2: -1.0,
        }
    }
}

/// A single modulation value source
pub trait Provider: Send {
    fn flags(&self) -> AbilityFlags {
        ABILITY_NOTHING_SPECIAL
    }

    fn generate(&mut self, input: &ProviderInput) -> f32;
}

type ProviderCtor = Box<dyn Fn() -> Box<dyn Provider> + Send + Sync>;

struct ProviderEntry {
    name: &'static str,
    flags: AbilityFlags,
    ctor: ProviderCtor,
}

/// Flat registry of available providers, keyed by FourCC identifier
#[derive(Default)]
pub struct ProviderRegistry {
    entries: HashMap<u32, ProviderEntry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in providers; the mixer-reading
    /// ones observe the given atomics block
    pub fn with_defaults(atomics: Arc<MixerAtomics>) -> Self {
        let mut registry = Self::new();

        registry.register(
            SIN_TIME_ID,
            "Sin( time )",
            ABILITY_USES_TIME | ABILITY_USES_REMAPPING,
            Box::new(|| Box::new(SinTime)),
        );

        registry.register(
            COS_BUS_ID,
            "Cos( bus-1 )",
            ABILITY_USES_VALUE | ABILITY_USES_BUS1 | ABILITY_USES_REMAPPING,
            Box::new(|| Box::new(CosBus)),
        );

        registry.register(
            MULTIPLY_2_ID,
            "Multiply 2",
            ABILITY_USES_BUS1 | ABILITY_USES_BUS2 | ABILITY_USES_REMAPPING,
            Box::new(|| Box::new(Multiply2)),
        );

        let percentage_atomics = atomics.clone();
        registry.register(
            RIFF_PERCENTAGE_ID,
            "Riff %",
            ABILITY_USES_REMAPPING,
            Box::new(move || {
                Box::new(RiffPercentage {
                    atomics: percentage_atomics.clone(),
                })
            }),
        );

        registry.register(
            MIX_TRANSITION_ID,
            "Transit",
            ABILITY_USES_REMAPPING,
            Box::new(move || {
                Box::new(MixTransition {
                    atomics: atomics.clone(),
                })
            }),
        );

        registry
    }

    /// Add a provider under `id`; later registrations of an existing id are
    /// ignored
    pub fn register(
        &mut self,
        id: u32,
        name: &'static str,
        flags: AbilityFlags,
        ctor: ProviderCtor,
    ) {
        if self.entries.contains_key(&id) {
            log::warn!("[databus] provider id {id:#010x} already registered, ignoring '{name}'");
            return;
        }
        self.entries.insert(id, ProviderEntry { name, flags, ctor });
    }

    /// Instantiate the provider registered under `id`
    pub fn create(&self, id: u32) -> Option<Box<dyn Provider>> {
        self.entries.get(&id).map(|entry| (entry.ctor)())
    }

    pub fn name(&self, id: u32) -> Option<&'static str> {
        self.entries.get(&id).map(|entry| entry.name)
    }

    pub fn flags(&self, id: u32) -> Option<AbilityFlags> {
        self.entries.get(&id).map(|entry| entry.flags)
    }

    /// Registered identifiers in a stable order, for UI listings
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

pub const SIN_TIME_ID: u32 = provider_id(*b"SINT");
pub const COS_BUS_ID: u32 = provider_id(*b"COSB");
pub const MULTIPLY_2_ID: u32 = provider_id(*b"MUL2");
pub const RIFF_PERCENTAGE_ID: u32 = provider_id(*b"RIF%");
pub const MIX_TRANSITION_ID: u32 = provider_id(*b"MXTR");

/// `sin(time)` normalized into [0, 1]
pub struct SinTime;

impl Provider for SinTime {
    fn flags(&self) -> AbilityFlags {
        ABILITY_USES_TIME | ABILITY_USES_REMAPPING
    }

    fn generate(&mut self, input: &ProviderInput) -> f32 {
        (1.0 + input.time.sin()) * 0.5
    }
}

/// Cosine of bus 1 scaled by the raw value, normalized into [0, 1];
/// reads as 0 while bus 1 is unpatched
pub struct CosBus;

impl Provider for CosBus {
    fn flags(&self) -> AbilityFlags {
        ABILITY_USES_VALUE | ABILITY_USES_BUS1 | ABILITY_USES_REMAPPING
    }

    fn generate(&mut self, input: &ProviderInput) -> f32 {
        if input.bus1 < 0.0 {
            return 0.0;
        }
        (1.0 + (input.bus1 * std::f32::consts::TAU * input.value).cos()) * 0.5
    }
}

/// Product of busses 1 and 2
pub struct Multiply2;

impl Provider for Multiply2 {
    fn flags(&self) -> AbilityFlags {
        ABILITY_USES_BUS1 | ABILITY_USES_BUS2 | ABILITY_USES_REMAPPING
    }

    fn generate(&mut self, input: &ProviderInput) -> f32 {
        input.bus1 * input.bus2
    }
}

/// Live riff playback percentage, read lock-free from the mixer
pub struct RiffPercentage {
    atomics: Arc<MixerAtomics>,
}

impl Provider for RiffPercentage {
    fn flags(&self) -> AbilityFlags {
        ABILITY_USES_REMAPPING
    }

    fn generate(&mut self, _input: &ProviderInput) -> f32 {
        self.atomics.playback_percentage() as f32
    }
}

/// Current riff-blend transition value, read lock-free from the mixer
pub struct MixTransition {
    atomics: Arc<MixerAtomics>,
}

impl Provider for MixTransition {
    fn flags(&self) -> AbilityFlags {
        ABILITY_USES_REMAPPING
    }

    fn generate(&mut self, _input: &ProviderInput) -> f32 {
        self.atomics.transition_value()
    }
}
