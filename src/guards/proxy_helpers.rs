//! Proxy and Reflect wrappers used to put guards in front of page capabilities.
//!
//! Every replacement is a `Proxy` around the original function, so the page
//! still sees the original's `name`, `length` and `toString()`.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::{GuardError, Result};

pub type ApplyTrap = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>;

/// Get the global window object.
pub fn window() -> Result<web_sys::Window> {
    web_sys::window().ok_or_else(|| GuardError::missing("window"))
}

pub fn document() -> Result<web_sys::Document> {
    window()?.document().ok_or_else(|| GuardError::missing("document"))
}

/// Get a global constructor's prototype (e.g., "EventTarget" → EventTarget.prototype).
pub fn get_prototype(constructor_name: &str) -> Result<JsValue> {
    let ctor = get_global(constructor_name)?;
    if ctor.is_undefined() {
        return Err(GuardError::missing(constructor_name));
    }
    Ok(Reflect::get(&ctor, &JsValue::from_str("prototype"))?)
}

/// Get a property from the global scope.
pub fn get_global(prop: &str) -> Result<JsValue> {
    Ok(Reflect::get(&js_sys::global(), &JsValue::from_str(prop))?)
}

/// Walk a dotted path from the global scope, e.g. `"chrome.runtime.sendMessage"`.
pub fn get_global_path(path: &str) -> Option<JsValue> {
    let mut value: JsValue = js_sys::global().into();
    for segment in path.split('.') {
        if value.is_undefined() || value.is_null() {
            return None;
        }
        value = Reflect::get(&value, &JsValue::from_str(segment)).ok()?;
    }
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(value)
    }
}

/// Look up a method that must exist before it can be guarded.
pub fn get_method(obj: &JsValue, name: &str) -> Result<JsValue> {
    let method = Reflect::get(obj, &JsValue::from_str(name))?;
    if method.is_function() {
        Ok(method)
    } else {
        Err(GuardError::missing(name))
    }
}

/// Create a Proxy around a target function with an `apply` trap.
/// The trap receives (target, thisArg, argumentsList).
pub fn proxy_function_with_apply(target: &JsValue, apply_trap: ApplyTrap) -> Result<JsValue> {
    let handler = Object::new();
    Reflect::set(&handler, &JsValue::from_str("apply"), apply_trap.as_ref())?;
    apply_trap.forget();

    let proxy_ctor: Function = get_global("Proxy")?
        .dyn_into()
        .map_err(|_| GuardError::missing("Proxy"))?;
    let args = Array::of2(target, &handler);
    Ok(Reflect::construct(&proxy_ctor, &args)?)
}

/// Replace `obj[name]` with a proxy of the current value. Returns the original.
pub fn guard_method(obj: &JsValue, name: &str, apply_trap: ApplyTrap) -> Result<JsValue> {
    let original = get_method(obj, name)?;
    let proxied = proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(obj, &JsValue::from_str(name), &proxied)?;
    Ok(original)
}

/// Define an accessor property with `Object.defineProperty`.
pub fn define_accessor(
    obj: &JsValue,
    prop_name: &str,
    getter: &Function,
    setter: &Function,
) -> Result<()> {
    let descriptor = Object::new();
    Reflect::set(&descriptor, &JsValue::from_str("get"), getter)?;
    Reflect::set(&descriptor, &JsValue::from_str("set"), setter)?;
    Reflect::set(&descriptor, &JsValue::from_str("configurable"), &JsValue::TRUE)?;

    // Reflect.defineProperty reports failure as `false` instead of throwing.
    let object_ctor = get_global("Object")?;
    let define_prop: Function = Reflect::get(&object_ctor, &JsValue::from_str("defineProperty"))?
        .dyn_into()
        .map_err(|_| GuardError::missing("Object.defineProperty"))?;
    let args = Array::of3(obj, &JsValue::from_str(prop_name), &descriptor);
    Reflect::apply(&define_prop, &JsValue::UNDEFINED, &args)?;
    Ok(())
}

/// `Object.getOwnPropertyDescriptor(obj, prop)`, if there is one.
pub fn own_property_descriptor(obj: &JsValue, prop_name: &str) -> Option<JsValue> {
    let object_ctor = get_global("Object").ok()?;
    let get_descriptor: Function =
        Reflect::get(&object_ctor, &JsValue::from_str("getOwnPropertyDescriptor"))
            .ok()?
            .dyn_into()
            .ok()?;
    let descriptor = get_descriptor
        .call2(&JsValue::UNDEFINED, obj, &JsValue::from_str(prop_name))
        .ok()?;
    if descriptor.is_undefined() {
        None
    } else {
        Some(descriptor)
    }
}

/// Call a JS function with arguments via Reflect.apply.
pub fn call_function(
    func: &JsValue,
    this_arg: &JsValue,
    args: &JsValue,
) -> std::result::Result<JsValue, JsValue> {
    let func: &Function = func.unchecked_ref();
    Reflect::apply(func, this_arg, args.unchecked_ref())
}

/// `argumentsList[index]` as a string, when it is one.
pub fn string_arg(args: &JsValue, index: u32) -> Option<String> {
    let args: &Array = args.unchecked_ref();
    args.get(index).as_string()
}

/// `String(value)`, the conversion the browser applies to url arguments.
/// `undefined` and `null` are absent; a throwing `toString` is an error.
pub fn coerce_string(value: &JsValue) -> std::result::Result<Option<String>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    if let Some(text) = value.as_string() {
        return Ok(Some(text));
    }
    let to_string: Function = Reflect::get(&js_sys::global(), &JsValue::from_str("String"))?.dyn_into()?;
    Ok(to_string.call1(&JsValue::UNDEFINED, value)?.as_string())
}

/// `argumentsList[index]` through [`coerce_string`].
pub fn coerced_arg(args: &JsValue, index: u32) -> std::result::Result<Option<String>, JsValue> {
    let args: &Array = args.unchecked_ref();
    coerce_string(&args.get(index))
}

/// Copy of `argumentsList` with `args[index]` replaced by `value`.
///
/// Forwarding the converted string keeps a stateful `toString` from handing
/// the original a different url than the one that was judged.
pub fn replace_arg(args: &JsValue, index: u32, value: &str) -> JsValue {
    let copy = Array::from(args);
    copy.set(index, JsValue::from_str(value));
    copy.into()
}

/// A function that ignores its arguments and returns `value`.
pub fn constant_function(value: JsValue) -> JsValue {
    Closure::wrap(Box::new(move || -> JsValue { value.clone() }) as Box<dyn FnMut() -> JsValue>)
        .into_js_value()
}
