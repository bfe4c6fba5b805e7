//! Generic signatures as stored in `Signature` attributes (JVMS 4.7.9.1).
//!
//! Only enough structure is recovered to pull the per-parameter and return
//! type signatures out of a method signature, and to tell whether a type
//! signature mentions a type variable.

/// The pieces of a generic method signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSignature {
    /// Formal type parameters including the angle brackets, if declared.
    pub type_parameters: Option<String>,
    pub params: Vec<String>,
    pub ret: String,
}

impl MethodSignature {
    pub fn declares_generics(&self) -> bool {
        self.type_parameters.is_some()
    }
}

/// Scan one type signature starting at `pos`, returning the position after it.
/// `saw_type_var` is set when a `T...;` type variable appears anywhere inside.
fn scan_type(sig: &[u8], pos: usize, saw_type_var: &mut bool) -> Option<usize> {
    match *sig.get(pos)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' => Some(pos + 1),
        b'[' => scan_type(sig, pos + 1, saw_type_var),
        b'T' => {
            *saw_type_var = true;
            let end = sig[pos..].iter().position(|&b| b == b';')?;
            Some(pos + end + 1)
        }
        b'L' => {
            let mut i = pos + 1;
            loop {
                match *sig.get(i)? {
                    b';' => return Some(i + 1),
                    b'<' => {
                        i += 1;
                        while *sig.get(i)? != b'>' {
                            i = scan_type_argument(sig, i, saw_type_var)?;
                        }
                        i += 1;
                    }
                    _ => i += 1,
                }
            }
        }
        _ => None,
    }
}

fn scan_type_argument(sig: &[u8], pos: usize, saw_type_var: &mut bool) -> Option<usize> {
    match *sig.get(pos)? {
        b'*' => Some(pos + 1),
        b'+' | b'-' => scan_type(sig, pos + 1, saw_type_var),
        _ => scan_type(sig, pos, saw_type_var),
    }
}

/// Skip a `<T:...;U::...;>` formal type parameter section.
fn scan_type_parameters(sig: &[u8], pos: usize) -> Option<usize> {
    let mut i = pos + 1;
    let mut ignored = false;
    while *sig.get(i)? != b'>' {
        // identifier up to the class bound separator
        while *sig.get(i)? != b':' {
            i += 1;
        }
        // class bound (may be empty), then any number of interface bounds
        while *sig.get(i)? == b':' {
            i += 1;
            if !matches!(sig.get(i), Some(b':') | Some(b'>')) {
                i = scan_type(sig, i, &mut ignored)?;
            }
        }
    }
    Some(i + 1)
}

/// Split a method signature into its type parameters, parameters and return type.
pub fn parse_method_signature(sig: &str) -> Option<MethodSignature> {
    let bytes = sig.as_bytes();
    let mut pos = 0;
    let type_parameters = if bytes.first() == Some(&b'<') {
        let end = scan_type_parameters(bytes, 0)?;
        let params = sig[..end].to_string();
        pos = end;
        Some(params)
    } else {
        None
    };
    if bytes.get(pos) != Some(&b'(') {
        return None;
    }
    pos += 1;
    let mut ignored = false;
    let mut params = Vec::new();
    while *bytes.get(pos)? != b')' {
        let end = scan_type(bytes, pos, &mut ignored)?;
        params.push(sig[pos..end].to_string());
        pos = end;
    }
    pos += 1;
    let end = scan_type(bytes, pos, &mut ignored)?;
    let ret = sig[pos..end].to_string();
    // Trailing `^` throws clauses are not needed.
    if end != bytes.len() && bytes[end] != b'^' {
        return None;
    }
    Some(MethodSignature {
        type_parameters,
        params,
        ret,
    })
}

/// Validate a single field type signature.
pub fn is_valid_type_signature(sig: &str) -> bool {
    let mut ignored = false;
    scan_type(sig.as_bytes(), 0, &mut ignored) == Some(sig.len())
}

/// True when the signature mentions a type variable, which cannot be carried
/// over to a class that does not declare it.
pub fn contains_type_variable(sig: &str) -> bool {
    let mut saw_type_var = false;
    let _ = scan_type(sig.as_bytes(), 0, &mut saw_type_var);
    saw_type_var
}
