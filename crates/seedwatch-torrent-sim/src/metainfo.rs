//! Minimal bencode reader extracting the fields the simulator needs from a descriptor.

/// Fields read from a descriptor's `info` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    /// Suggested transfer name (`info.name`).
    pub name: String,
    /// Payload length: `info.length`, or the sum of `info.files[].length`.
    pub total_length: u64,
}

const MAX_DEPTH: usize = 64;

#[derive(Debug)]
enum Value<'a> {
    Int(i64),
    Bytes(&'a [u8]),
    List(Vec<Value<'a>>),
    Dict(Vec<(&'a [u8], Value<'a>)>),
}

impl<'a> Value<'a> {
    fn get(&self, key: &[u8]) -> Option<&Value<'a>> {
        match self {
            Self::Dict(entries) => entries
                .iter()
                .find(|(candidate, _)| *candidate == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    fn as_length(&self) -> Option<u64> {
        match self {
            Self::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), &'static str> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err("malformed bencode")
        }
    }

    fn take_until(&mut self, terminator: u8) -> Result<&'a str, &'static str> {
        let rest = self.input.get(self.pos..).ok_or("truncated bencode")?;
        let end = rest
            .iter()
            .position(|byte| *byte == terminator)
            .ok_or("truncated bencode")?;
        let digits = std::str::from_utf8(&rest[..end]).map_err(|_| "malformed bencode")?;
        self.pos += end + 1;
        Ok(digits)
    }

    fn value(&mut self, depth: usize) -> Result<Value<'a>, &'static str> {
        if depth > MAX_DEPTH {
            return Err("bencode nested too deeply");
        }
        match self.peek().ok_or("truncated bencode")? {
            b'i' => {
                self.pos += 1;
                let digits = self.take_until(b'e')?;
                digits
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| "malformed bencode integer")
            }
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek() != Some(b'e') {
                    items.push(self.value(depth + 1)?);
                }
                self.expect(b'e')?;
                Ok(Value::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut entries = Vec::new();
                while self.peek() != Some(b'e') {
                    let key = self.bytes()?;
                    let value = self.value(depth + 1)?;
                    entries.push((key, value));
                }
                self.expect(b'e')?;
                Ok(Value::Dict(entries))
            }
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            _ => Err("malformed bencode"),
        }
    }

    fn bytes(&mut self) -> Result<&'a [u8], &'static str> {
        let len = self
            .take_until(b':')?
            .parse::<usize>()
            .map_err(|_| "malformed bencode string length")?;
        let end = self.pos.checked_add(len).ok_or("truncated bencode")?;
        let slice = self.input.get(self.pos..end).ok_or("truncated bencode")?;
        self.pos = end;
        Ok(slice)
    }
}

/// Parse a descriptor, returning a static reason on rejection.
///
/// # Errors
///
/// Returns a machine-readable reason when the input is not bencode, lacks an `info` dictionary,
/// or carries no usable name or length.
pub fn parse(input: &[u8]) -> Result<Metainfo, &'static str> {
    let mut decoder = Decoder { input, pos: 0 };
    let root = decoder.value(0)?;
    if decoder.pos != input.len() {
        return Err("trailing data after bencode");
    }

    let info = root.get(b"info").ok_or("missing info dictionary")?;
    if !matches!(info, Value::Dict(_)) {
        return Err("missing info dictionary");
    }

    let name = match info.get(b"name") {
        Some(Value::Bytes(raw)) => String::from_utf8_lossy(raw).into_owned(),
        _ => return Err("missing name"),
    };

    let total_length = match (info.get(b"length"), info.get(b"files")) {
        (Some(length), _) => length.as_length().ok_or("invalid length")?,
        (None, Some(Value::List(files))) => {
            let mut total: u64 = 0;
            for file in files {
                let length = file
                    .get(b"length")
                    .and_then(Value::as_length)
                    .ok_or("invalid file length")?;
                total = total.checked_add(length).ok_or("invalid file length")?;
            }
            total
        }
        _ => return Err("missing length"),
    };

    Ok(Metainfo { name, total_length })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_descriptor() {
        let raw = b"d8:announce3:url4:infod6:lengthi1000e4:name5:movie12:piece lengthi16384eee";
        assert_eq!(
            parse(raw),
            Ok(Metainfo {
                name: "movie".into(),
                total_length: 1000,
            })
        );
    }

    #[test]
    fn multi_file_lengths_are_summed() {
        let raw = b"d4:infod5:filesld6:lengthi10e4:pathl1:aeed6:lengthi32e4:pathl1:beee4:name3:setee";
        assert_eq!(
            parse(raw),
            Ok(Metainfo {
                name: "set".into(),
                total_length: 42,
            })
        );
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert_eq!(parse(b""), Err("truncated bencode"));
        assert_eq!(parse(b"not bencode"), Err("malformed bencode"));
        assert_eq!(parse(b"d3:foo3:bare"), Err("missing info dictionary"));
        assert_eq!(parse(b"d4:infod4:name1:aee"), Err("missing length"));
        assert_eq!(parse(b"d4:infod6:lengthi5eee"), Err("missing name"));
        assert_eq!(parse(b"d4:infod6:lengthi-5e4:name1:aee"), Err("invalid length"));
        assert_eq!(parse(b"d4:infod6:lengthi5e4:name1:aeexx"), Err("trailing data after bencode"));
        assert_eq!(parse(b"d4:infod4:name99:aee"), Err("truncated bencode"));
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let mut raw = vec![b'l'; MAX_DEPTH + 2];
        raw.extend(vec![b'e'; MAX_DEPTH + 2]);
        assert_eq!(parse(&raw), Err("bencode nested too deeply"));
    }
}
