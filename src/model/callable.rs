//! Type-erased callables carried by descriptors.
//!
//! The host runtime calls reflected members through an opaque object pointer and an array of
//! opaque argument pointers. In Rust that is `&mut dyn Any` for the object and
//! `&mut [&mut dyn Any]` for the argument slots, where slot `0` is reserved for the result and
//! slots `1..` hold the arguments in declaration order.
//!
//! Typed Rust closures are adapted to that calling convention through [`IntoInvoker`] and
//! [`IntoFactory`]; property accessors use [`Getter`], [`Setter`] and [`Reset`]. A slot holding a
//! value of the wrong type is reported as [`Error::WrongAccessorShape`] when the call happens,
//! never earlier.

use std::{
    any::{type_name, Any, TypeId},
    fmt,
    sync::Arc,
};

use crate::{typesystem::TypeInfo, Error, Result};

/// Outcome of an erased call: `Err` names the Rust type a slot was expected to hold.
type Shape<T> = std::result::Result<T, &'static str>;

type InvokeFn = dyn Fn(&mut dyn Any, &mut [&mut dyn Any]) -> Shape<()> + Send + Sync;
type FactoryFn = dyn Fn(&[&mut dyn Any]) -> Shape<Box<dyn Any>> + Send + Sync;
type GetFn = dyn Fn(&dyn Any, &mut dyn Any) -> Shape<()> + Send + Sync;
type SetFn = dyn Fn(&mut dyn Any, &dyn Any) -> Shape<()> + Send + Sync;
type ResetFn = dyn Fn(&mut dyn Any) -> Shape<()> + Send + Sync;

fn shape_error(member: &str, expected: &'static str) -> Error {
    Error::WrongAccessorShape {
        member: member.to_string(),
        expected,
    }
}

/// Read argument `index` out of the slot array.
fn arg<T: Any + Clone>(slots: &[&mut dyn Any], index: usize) -> Shape<T> {
    slots
        .get(index)
        .and_then(|slot| (&**slot).downcast_ref::<T>())
        .cloned()
        .ok_or(type_name::<T>())
}

/// Write a result through slot 0.
///
/// Void results are never written. A missing slot or a `()` placeholder means the caller
/// discards the result.
fn store_result<R: Any>(slots: &mut [&mut dyn Any], value: R) -> Shape<()> {
    if TypeId::of::<R>() == TypeId::of::<()>() {
        return Ok(());
    }

    match slots.first_mut() {
        None => Ok(()),
        Some(slot) => {
            if let Some(out) = (**slot).downcast_mut::<R>() {
                *out = value;
                Ok(())
            } else if (**slot).is::<()>() {
                Ok(())
            } else {
                Err(type_name::<R>())
            }
        }
    }
}

/// A method, slot or signal body callable by index.
#[derive(Clone)]
pub struct Invoker {
    ret: TypeInfo,
    args: Vec<TypeInfo>,
    call: Arc<InvokeFn>,
}

impl Invoker {
    /// Static return type of the callable.
    #[must_use]
    pub fn return_type(&self) -> &TypeInfo {
        &self.ret
    }

    /// Static argument types of the callable, in order.
    #[must_use]
    pub fn arg_types(&self) -> &[TypeInfo] {
        &self.args
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Call with `obj` as receiver; arguments are read from `slots[1..]`, a non-void result is
    /// written to `slots[0]`.
    ///
    /// # Errors
    /// Returns [`Error::WrongAccessorShape`] if `obj` or a slot holds a different type.
    pub fn invoke(&self, member: &str, obj: &mut dyn Any, slots: &mut [&mut dyn Any]) -> Result<()> {
        (self.call)(obj, slots).map_err(|expected| shape_error(member, expected))
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invoker({:?} -> {:?})", self.args, self.ret)
    }
}

/// Conversion of a typed closure `Fn(&mut C, A0, A1, ..) -> R` into an [`Invoker`].
///
/// The `Marker` parameter only disambiguates the arities and is inferred.
pub trait IntoInvoker<C, Marker> {
    /// Erase the closure.
    fn into_invoker(self) -> Invoker;
}

macro_rules! impl_into_invoker {
    ($($arg:ident => $idx:tt),*) => {
        impl<C, R, F, $($arg,)*> IntoInvoker<C, fn($($arg,)*) -> R> for F
        where
            C: Any,
            R: Any,
            F: Fn(&mut C, $($arg,)*) -> R + Send + Sync + 'static,
            $($arg: Any + Clone,)*
        {
            fn into_invoker(self) -> Invoker {
                Invoker {
                    ret: TypeInfo::of::<R>(),
                    args: vec![$(TypeInfo::of::<$arg>(),)*],
                    call: Arc::new(move |obj: &mut dyn Any, slots: &mut [&mut dyn Any]| -> Shape<()> {
                        let obj = obj.downcast_mut::<C>().ok_or(type_name::<C>())?;
                        let result = (self)(obj, $(arg::<$arg>(slots, $idx + 1)?,)*);
                        store_result(slots, result)
                    }),
                }
            }
        }
    };
}

impl_into_invoker!();
impl_into_invoker!(A0 => 0);
impl_into_invoker!(A0 => 0, A1 => 1);
impl_into_invoker!(A0 => 0, A1 => 1, A2 => 2);
impl_into_invoker!(A0 => 0, A1 => 1, A2 => 2, A3 => 3);
impl_into_invoker!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4);

/// Creates a new instance of a class from constructor arguments.
#[derive(Clone)]
pub struct Factory {
    class: TypeInfo,
    args: Vec<TypeInfo>,
    call: Arc<FactoryFn>,
}

impl Factory {
    /// Type of the created instance.
    #[must_use]
    pub fn class_type(&self) -> &TypeInfo {
        &self.class
    }

    /// Static argument types, in order.
    #[must_use]
    pub fn arg_types(&self) -> &[TypeInfo] {
        &self.args
    }

    /// Create an instance from the arguments in `slots[1..]`.
    ///
    /// # Errors
    /// Returns [`Error::WrongAccessorShape`] if a slot holds a different type.
    pub fn create(&self, member: &str, slots: &[&mut dyn Any]) -> Result<Box<dyn Any>> {
        (self.call)(slots).map_err(|expected| shape_error(member, expected))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Factory({:?} -> {:?})", self.args, self.class)
    }
}

/// Conversion of a typed closure `Fn(A0, A1, ..) -> C` into a [`Factory`].
pub trait IntoFactory<Marker> {
    /// Erase the closure.
    fn into_factory(self) -> Factory;
}

macro_rules! impl_into_factory {
    ($($arg:ident => $idx:tt),*) => {
        impl<C, F, $($arg,)*> IntoFactory<fn($($arg,)*) -> C> for F
        where
            C: Any,
            F: Fn($($arg,)*) -> C + Send + Sync + 'static,
            $($arg: Any + Clone,)*
        {
            #[allow(unused_variables)]
            fn into_factory(self) -> Factory {
                Factory {
                    class: TypeInfo::of::<C>(),
                    args: vec![$(TypeInfo::of::<$arg>(),)*],
                    call: Arc::new(move |slots: &[&mut dyn Any]| -> Shape<Box<dyn Any>> {
                        let instance = (self)($(arg::<$arg>(slots, $idx + 1)?,)*);
                        Ok(Box::new(instance) as Box<dyn Any>)
                    }),
                }
            }
        }
    };
}

impl_into_factory!();
impl_into_factory!(A0 => 0);
impl_into_factory!(A0 => 0, A1 => 1);
impl_into_factory!(A0 => 0, A1 => 1, A2 => 2);
impl_into_factory!(A0 => 0, A1 => 1, A2 => 2, A3 => 3);

/// Reads a property value into an output slot.
#[derive(Clone)]
pub struct Getter {
    value: TypeInfo,
    call: Arc<GetFn>,
}

impl Getter {
    /// Adapt `Fn(&C) -> T`.
    pub fn new<C: Any, T: Any>(f: impl Fn(&C) -> T + Send + Sync + 'static) -> Self {
        Getter {
            value: TypeInfo::of::<T>(),
            call: Arc::new(move |obj: &dyn Any, out: &mut dyn Any| -> Shape<()> {
                let obj = obj.downcast_ref::<C>().ok_or(type_name::<C>())?;
                let out = out.downcast_mut::<T>().ok_or(type_name::<T>())?;
                *out = f(obj);
                Ok(())
            }),
        }
    }

    /// Adapt a field projection `fn(&C) -> &T`.
    pub fn field<C: Any, T: Any + Clone>(get: fn(&C) -> &T) -> Self {
        Getter::new(move |obj: &C| get(obj).clone())
    }

    /// Type the getter produces.
    #[must_use]
    pub fn value_type(&self) -> &TypeInfo {
        &self.value
    }

    /// Read from `obj` into `out`.
    ///
    /// # Errors
    /// Returns [`Error::WrongAccessorShape`] if `obj` or `out` has a different type.
    pub fn get(&self, member: &str, obj: &dyn Any, out: &mut dyn Any) -> Result<()> {
        (self.call)(obj, out).map_err(|expected| shape_error(member, expected))
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Getter(-> {:?})", self.value)
    }
}

/// Writes a property value from an input slot.
#[derive(Clone)]
pub struct Setter {
    value: TypeInfo,
    call: Arc<SetFn>,
}

impl Setter {
    /// Adapt `Fn(&mut C, T)`.
    pub fn new<C: Any, T: Any + Clone>(f: impl Fn(&mut C, T) + Send + Sync + 'static) -> Self {
        Setter {
            value: TypeInfo::of::<T>(),
            call: Arc::new(move |obj: &mut dyn Any, value: &dyn Any| -> Shape<()> {
                let obj = obj.downcast_mut::<C>().ok_or(type_name::<C>())?;
                let value = value.downcast_ref::<T>().ok_or(type_name::<T>())?;
                f(obj, value.clone());
                Ok(())
            }),
        }
    }

    /// Adapt a mutable field projection `fn(&mut C) -> &mut T`.
    pub fn field<C: Any, T: Any + Clone>(get_mut: fn(&mut C) -> &mut T) -> Self {
        Setter::new(move |obj: &mut C, value: T| *get_mut(obj) = value)
    }

    /// Type the setter accepts.
    #[must_use]
    pub fn value_type(&self) -> &TypeInfo {
        &self.value
    }

    /// Write `value` into `obj`.
    ///
    /// # Errors
    /// Returns [`Error::WrongAccessorShape`] if `obj` or `value` has a different type.
    pub fn set(&self, member: &str, obj: &mut dyn Any, value: &dyn Any) -> Result<()> {
        (self.call)(obj, value).map_err(|expected| shape_error(member, expected))
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setter({:?})", self.value)
    }
}

/// Restores a property to its default.
#[derive(Clone)]
pub struct Reset {
    call: Arc<ResetFn>,
}

impl Reset {
    /// Adapt `Fn(&mut C)`.
    pub fn new<C: Any>(f: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        Reset {
            call: Arc::new(move |obj: &mut dyn Any| -> Shape<()> {
                let obj = obj.downcast_mut::<C>().ok_or(type_name::<C>())?;
                f(obj);
                Ok(())
            }),
        }
    }

    /// Reset `obj`.
    ///
    /// # Errors
    /// Returns [`Error::WrongAccessorShape`] if `obj` has a different type.
    pub fn reset(&self, member: &str, obj: &mut dyn Any) -> Result<()> {
        (self.call)(obj).map_err(|expected| shape_error(member, expected))
    }
}

impl fmt::Debug for Reset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reset")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Acc {
        total: i32,
    }

    fn add(acc: &mut Acc, a: i32, b: i32) -> i32 {
        acc.total += a + b;
        acc.total
    }

    #[test]
    fn invoke_writes_result() {
        let invoker = add.into_invoker();
        assert_eq!(invoker.arity(), 2);
        assert_eq!(invoker.return_type(), &TypeInfo::of::<i32>());

        let mut acc = Acc::default();
        let mut ret = 0i32;
        let mut a = 2i32;
        let mut b = 3i32;
        invoker
            .invoke("add", &mut acc, &mut [&mut ret, &mut a, &mut b])
            .unwrap();
        assert_eq!(ret, 5);
        assert_eq!(acc.total, 5);
    }

    #[test]
    fn invoke_discards_result() {
        let invoker = add.into_invoker();
        let mut acc = Acc::default();
        let mut a = 1i32;
        let mut b = 1i32;
        invoker
            .invoke("add", &mut acc, &mut [&mut (), &mut a, &mut b])
            .unwrap();
        assert_eq!(acc.total, 2);
    }

    #[test]
    fn invoke_wrong_shape() {
        let invoker = add.into_invoker();
        let mut acc = Acc::default();
        let mut a = String::from("nope");
        let mut b = 1i32;
        let err = invoker
            .invoke("add", &mut acc, &mut [&mut (), &mut a, &mut b])
            .unwrap_err();
        assert!(matches!(err, Error::WrongAccessorShape { expected: "i32", .. }));

        let mut wrong = 0u8;
        let err = invoker
            .invoke("add", &mut wrong, &mut [&mut (), &mut 1i32, &mut 1i32])
            .unwrap_err();
        assert!(matches!(err, Error::WrongAccessorShape { ref member, .. } if member == "add"));
    }

    #[test]
    fn void_invoker() {
        let invoker = (|acc: &mut Acc| acc.total += 1).into_invoker();
        assert_eq!(invoker.return_type(), &TypeInfo::of::<()>());
        let mut acc = Acc::default();
        invoker.invoke("bump", &mut acc, &mut []).unwrap();
        assert_eq!(acc.total, 1);
    }

    #[test]
    fn factory_creates() {
        let factory = (|total: i32| Acc { total }).into_factory();
        assert_eq!(factory.arg_types().len(), 1);
        let instance = factory.create("Acc", &[&mut (), &mut 7i32]).unwrap();
        assert_eq!(instance.downcast_ref::<Acc>().unwrap().total, 7);
    }

    #[test]
    fn accessors() {
        let getter = Getter::field(|acc: &Acc| &acc.total);
        let setter = Setter::field(|acc: &mut Acc| &mut acc.total);
        let reset = Reset::new(|acc: &mut Acc| acc.total = 0);

        let mut acc = Acc::default();
        setter.set("total", &mut acc, &42i32).unwrap();
        let mut out = 0i32;
        getter.get("total", &acc, &mut out).unwrap();
        assert_eq!(out, 42);

        reset.reset("total", &mut acc).unwrap();
        assert_eq!(acc.total, 0);

        let mut wrong = 0.0f64;
        assert!(getter.get("total", &acc, &mut wrong).is_err());
        assert!(setter.set("total", &mut acc, &1u64).is_err());
    }
}
