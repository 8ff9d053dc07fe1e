//! Caller-registered extension payloads carried by headers, bodies and
//! accounts.
//!
//! A [`Registry`] binds at most one payload type to each [`CarrierKind`].
//! Carriers store their payload type-erased in an [`ExtraPayload`] slot and
//! hand the registry's [`Payloads`] accessor out for typed access. A payload
//! left at its default value appends no fields, so carriers encode exactly as
//! they would without an extension.

pub mod global;

use core::any::{type_name, Any, TypeId};
use core::fmt;
use core::marker::PhantomData;

use keel_codec::{CodecError, Decodable, ListEncoder, Stream};
use tracing::debug;

use crate::ExtrasError;

/// Objects that can carry an extension payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierKind {
    Header,
    Body,
    StateAccount,
}

impl CarrierKind {
    const ALL: [CarrierKind; 3] = [
        CarrierKind::Header,
        CarrierKind::Body,
        CarrierKind::StateAccount,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarrierKind::Header => f.write_str("header"),
            CarrierKind::Body => f.write_str("body"),
            CarrierKind::StateAccount => f.write_str("state account"),
        }
    }
}

/// A type that can ride along in a carrier's encoding.
pub trait Payload: Any + Clone + Default + fmt::Debug + Eq + Send + Sync {
    /// Appends this payload's fields after the carrier's own. The default
    /// value must append nothing.
    fn encode_fields(&self, fields: &mut ListEncoder);

    /// Reads the items left over once the carrier has read its own fields.
    /// Items left unread make the carrier decode fail.
    fn decode_fields(&mut self, rest: &mut Stream<'_>) -> Result<(), CodecError>;
}

/// Contributes nothing. Registering it reserves a carrier kind.
impl Payload for () {
    fn encode_fields(&self, _fields: &mut ListEncoder) {}

    fn decode_fields(&mut self, _rest: &mut Stream<'_>) -> Result<(), CodecError> {
        Ok(())
    }
}

/// `false` writes nothing; `true` writes a single `0x01` field.
impl Payload for bool {
    fn encode_fields(&self, fields: &mut ListEncoder) {
        if *self {
            fields.push(&true);
        }
    }

    fn decode_fields(&mut self, rest: &mut Stream<'_>) -> Result<(), CodecError> {
        *self = if rest.is_empty() {
            false
        } else {
            bool::decode(rest)?
        };
        Ok(())
    }
}

trait ErasedPayload: Any + Send + Sync + fmt::Debug {
    fn clone_box(&self) -> Box<dyn ErasedPayload>;
    fn eq_erased(&self, other: &dyn ErasedPayload) -> bool;
    fn is_default(&self) -> bool;
    fn encode_fields(&self, fields: &mut ListEncoder);
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<P: Payload> ErasedPayload for P {
    fn clone_box(&self) -> Box<dyn ErasedPayload> {
        Box::new(self.clone())
    }

    fn eq_erased(&self, other: &dyn ErasedPayload) -> bool {
        other.as_any().downcast_ref::<P>() == Some(self)
    }

    fn is_default(&self) -> bool {
        *self == P::default()
    }

    fn encode_fields(&self, fields: &mut ListEncoder) {
        Payload::encode_fields(self, fields)
    }

    fn type_name(&self) -> &'static str {
        type_name::<P>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Type-erased extension slot owned by a carrier.
///
/// An empty slot and a slot holding a default value compare equal. Cloning
/// deep-copies the payload.
#[derive(Default)]
pub struct ExtraPayload(Option<Box<dyn ErasedPayload>>);

impl ExtraPayload {
    pub fn new<P: Payload>(value: P) -> Self {
        Self(Some(Box::new(value)))
    }

    /// True when nothing has been materialized yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Name of the stored type, if any.
    pub fn type_name(&self) -> Option<&'static str> {
        self.0.as_deref().map(ErasedPayload::type_name)
    }

    pub fn downcast_ref<P: Payload>(&self) -> Option<&P> {
        self.0.as_deref()?.as_any().downcast_ref()
    }

    fn downcast_mut<P: Payload>(&mut self) -> Option<&mut P> {
        self.0.as_deref_mut()?.as_any_mut().downcast_mut()
    }

    fn is_default(&self) -> bool {
        self.0.as_deref().map_or(true, ErasedPayload::is_default)
    }

    /// Appends the payload's fields, if any.
    pub fn encode_fields(&self, fields: &mut ListEncoder) {
        if let Some(payload) = self.0.as_deref() {
            payload.encode_fields(fields);
        }
    }
}

impl Clone for ExtraPayload {
    fn clone(&self) -> Self {
        Self(self.0.as_deref().map(ErasedPayload::clone_box))
    }
}

impl PartialEq for ExtraPayload {
    fn eq(&self, other: &Self) -> bool {
        match (self.0.as_deref(), other.0.as_deref()) {
            (Some(a), Some(b)) => a.eq_erased(b),
            _ => self.is_default() && other.is_default(),
        }
    }
}

impl Eq for ExtraPayload {}

impl fmt::Debug for ExtraPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_deref() {
            Some(payload) => payload.fmt(f),
            None => f.write_str("<none>"),
        }
    }
}

/// Objects with an extension slot.
pub trait Carrier {
    const KIND: CarrierKind;

    fn extras(&self) -> &ExtraPayload;
    fn extras_mut(&mut self) -> &mut ExtraPayload;
}

#[derive(Clone, Copy)]
struct Binding {
    type_id: TypeId,
    type_name: &'static str,
    decode: fn(&mut Stream<'_>) -> Result<ExtraPayload, CodecError>,
}

/// A default payload encodes to nothing, so one read from items is
/// rejected.
fn decode_binding<P: Payload>(rest: &mut Stream<'_>) -> Result<ExtraPayload, CodecError> {
    let before = rest.remaining().len();
    let mut value = P::default();
    value.decode_fields(rest)?;
    if rest.remaining().len() != before && value == P::default() {
        return Err(CodecError::RedundantField);
    }
    Ok(ExtraPayload::new(value))
}

impl Binding {
    fn of<P: Payload>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
            decode: decode_binding::<P>,
        }
    }
}

/// Collects bindings until [`RegistryBuilder::finalize`] freezes them.
#[derive(Default)]
pub struct RegistryBuilder {
    bindings: [Option<Binding>; 3],
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `P` as the payload of carrier `C`. Each carrier kind can be
    /// bound once.
    pub fn register<C: Carrier, P: Payload>(mut self) -> Result<Self, ExtrasError> {
        let slot = &mut self.bindings[C::KIND.index()];
        if let Some(existing) = slot {
            return Err(ExtrasError::DoubleRegistration {
                kind: C::KIND,
                registered: existing.type_name,
            });
        }
        debug!(carrier = %C::KIND, payload = type_name::<P>(), "registered extra payload");
        *slot = Some(Binding::of::<P>());
        Ok(self)
    }

    pub fn finalize(self) -> Registry {
        Registry {
            bindings: self.bindings,
        }
    }
}

/// Frozen carrier-to-payload bindings. Cheap to copy and share.
#[derive(Clone, Copy, Default)]
pub struct Registry {
    bindings: [Option<Binding>; 3],
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry with no bindings: every carrier encodes as unextended.
    pub fn empty() -> Self {
        Self::default()
    }

    fn binding(&self, kind: CarrierKind) -> Option<&Binding> {
        self.bindings[kind.index()].as_ref()
    }

    pub fn is_registered(&self, kind: CarrierKind) -> bool {
        self.binding(kind).is_some()
    }

    /// Typed accessor for the payload bound to `C`.
    pub fn payloads<C: Carrier, P: Payload>(&self) -> Result<Payloads<C, P>, ExtrasError> {
        let binding = self
            .binding(C::KIND)
            .ok_or(ExtrasError::NotRegistered(C::KIND))?;
        if binding.type_id != TypeId::of::<P>() {
            return Err(ExtrasError::TypeMismatch {
                kind: C::KIND,
                registered: binding.type_name,
                requested: type_name::<P>(),
            });
        }
        Ok(Payloads {
            _marker: PhantomData,
        })
    }

    /// Hands the items left after a carrier's own fields to the bound
    /// payload. Without a binding nothing is consumed and the slot stays
    /// empty.
    pub fn decode_extras(
        &self,
        kind: CarrierKind,
        rest: &mut Stream<'_>,
    ) -> Result<ExtraPayload, CodecError> {
        match self.binding(kind) {
            Some(binding) => (binding.decode)(rest),
            None => Ok(ExtraPayload::default()),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in CarrierKind::ALL {
            if let Some(binding) = self.binding(kind) {
                map.entry(&kind, &binding.type_name);
            }
        }
        map.finish()
    }
}

/// Typed access to the `P` payload of carriers of type `C`.
///
/// Only obtainable from a [`Registry`] that binds `P` to `C`.
pub struct Payloads<C, P> {
    _marker: PhantomData<fn() -> (C, P)>,
}

impl<C, P> Clone for Payloads<C, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, P> Copy for Payloads<C, P> {}

impl<C, P> fmt::Debug for Payloads<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payloads<{}, {}>", type_name::<C>(), type_name::<P>())
    }
}

impl<C: Carrier, P: Payload> Payloads<C, P> {
    fn mismatch(stored: &'static str) -> ExtrasError {
        ExtrasError::TypeMismatch {
            kind: C::KIND,
            registered: stored,
            requested: type_name::<P>(),
        }
    }

    /// Copy of the carrier's payload. An empty slot reads as the default.
    pub fn get(&self, carrier: &C) -> Result<P, ExtrasError> {
        let extras = carrier.extras();
        match extras.type_name() {
            None => Ok(P::default()),
            Some(stored) => extras
                .downcast_ref::<P>()
                .cloned()
                .ok_or_else(|| Self::mismatch(stored)),
        }
    }

    /// Mutable access, materializing the default on first use.
    pub fn get_mut<'c>(&self, carrier: &'c mut C) -> Result<&'c mut P, ExtrasError> {
        let extras = carrier.extras_mut();
        if extras.is_empty() {
            *extras = ExtraPayload::new(P::default());
        }
        let stored = extras.type_name().unwrap_or("<none>");
        extras
            .downcast_mut::<P>()
            .ok_or_else(|| Self::mismatch(stored))
    }

    /// Replaces the carrier's payload.
    pub fn set(&self, carrier: &mut C, value: P) {
        *carrier.extras_mut() = ExtraPayload::new(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[derive(Debug, Default)]
    struct Dummy {
        extras: ExtraPayload,
    }

    impl Carrier for Dummy {
        const KIND: CarrierKind = CarrierKind::Header;

        fn extras(&self) -> &ExtraPayload {
            &self.extras
        }

        fn extras_mut(&mut self) -> &mut ExtraPayload {
            &mut self.extras
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    struct Counter(u64);

    impl Payload for Counter {
        fn encode_fields(&self, fields: &mut ListEncoder) {
            if self.0 != 0 {
                fields.push(&self.0);
            }
        }

        fn decode_fields(&mut self, rest: &mut Stream<'_>) -> Result<(), CodecError> {
            if !rest.is_empty() {
                self.0 = rest.decode()?;
            }
            Ok(())
        }
    }

    #[test]
    fn second_registration_is_rejected() {
        let builder = Registry::builder()
            .register::<Dummy, Counter>()
            .unwrap();
        assert_eq!(
            builder.register::<Dummy, bool>().err(),
            Some(ExtrasError::DoubleRegistration {
                kind: CarrierKind::Header,
                registered: type_name::<Counter>(),
            })
        );
    }

    #[test]
    fn accessor_requires_matching_binding() {
        let empty = Registry::empty();
        assert_eq!(
            empty.payloads::<Dummy, Counter>().err(),
            Some(ExtrasError::NotRegistered(CarrierKind::Header))
        );

        let registry = Registry::builder()
            .register::<Dummy, Counter>()
            .unwrap()
            .finalize();
        assert!(matches!(
            registry.payloads::<Dummy, bool>(),
            Err(ExtrasError::TypeMismatch { .. })
        ));
        assert!(registry.payloads::<Dummy, Counter>().is_ok());
    }

    #[test]
    fn get_materializes_default_and_set_replaces() {
        let registry = Registry::builder()
            .register::<Dummy, Counter>()
            .unwrap()
            .finalize();
        let counters = registry.payloads::<Dummy, Counter>().unwrap();

        let mut carrier = Dummy::default();
        assert_eq!(counters.get(&carrier), Ok(Counter(0)));
        assert!(carrier.extras.is_empty());

        counters.get_mut(&mut carrier).unwrap().0 += 5;
        assert!(!carrier.extras.is_empty());
        assert_eq!(counters.get(&carrier), Ok(Counter(5)));

        counters.set(&mut carrier, Counter(9));
        assert_eq!(counters.get(&carrier), Ok(Counter(9)));
    }

    #[test]
    fn foreign_value_is_a_mismatch() {
        let registry = Registry::builder()
            .register::<Dummy, Counter>()
            .unwrap()
            .finalize();
        let counters = registry.payloads::<Dummy, Counter>().unwrap();
        let mut carrier = Dummy {
            extras: ExtraPayload::new(true),
        };
        assert!(matches!(
            counters.get(&carrier),
            Err(ExtrasError::TypeMismatch { registered: "bool", .. })
        ));
        assert!(counters.get_mut(&mut carrier).is_err());
    }

    #[test]
    fn clones_do_not_alias() {
        let registry = Registry::builder()
            .register::<Dummy, Counter>()
            .unwrap()
            .finalize();
        let counters = registry.payloads::<Dummy, Counter>().unwrap();
        let mut original = Dummy {
            extras: ExtraPayload::new(Counter(1)),
        };
        let copy = Dummy {
            extras: original.extras.clone(),
        };
        counters.get_mut(&mut original).unwrap().0 = 2;
        assert_eq!(counters.get(&copy), Ok(Counter(1)));
        assert_ne!(original.extras, copy.extras);
    }

    #[test]
    fn empty_slot_equals_default_value() {
        assert_eq!(ExtraPayload::default(), ExtraPayload::new(false));
        assert_eq!(ExtraPayload::default(), ExtraPayload::new(Counter(0)));
        assert_ne!(ExtraPayload::default(), ExtraPayload::new(true));
        assert_ne!(ExtraPayload::new(false), ExtraPayload::new(Counter(0)));
    }

    #[test]
    fn bool_payload_fields() {
        let mut fields = ListEncoder::new();
        ExtraPayload::new(false).encode_fields(&mut fields);
        assert!(fields.is_empty());
        ExtraPayload::new(true).encode_fields(&mut fields);
        assert_eq!(fields.finish(), hex!("c101"));

        let registry = Registry::builder()
            .register::<Dummy, bool>()
            .unwrap()
            .finalize();
        let decoded = registry
            .decode_extras(CarrierKind::Header, &mut Stream::new(&hex!("01")))
            .unwrap();
        assert_eq!(decoded.downcast_ref::<bool>(), Some(&true));
        let decoded = registry
            .decode_extras(CarrierKind::Header, &mut Stream::new(&[]))
            .unwrap();
        assert_eq!(decoded.downcast_ref::<bool>(), Some(&false));
        // false is never written
        assert_eq!(
            registry.decode_extras(CarrierKind::Header, &mut Stream::new(&hex!("80"))),
            Err(CodecError::RedundantField)
        );
    }

    #[test]
    fn registry_debug_lists_bindings() {
        let registry = Registry::builder()
            .register::<Dummy, bool>()
            .unwrap()
            .finalize();
        assert_eq!(format!("{registry:?}"), "{Header: \"bool\"}");
    }
}
