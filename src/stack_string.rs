use std::str::from_utf8_unchecked;
use thiserror::Error;

/// As per [fork(2)](https://man7.org/linux/man-pages/man2/fork.2.html) only async-signal-safe
/// functions should be called after `fork` until `execve` is called.
/// The per-task hook runs in that window, so the control file path and the
/// decimal value written into it are composed into stack-backed strings.
/// Composition never truncates: output that won't fit is an error.
#[derive(Copy, Clone, Debug)]
pub struct String<const N: usize> {
    buf: [u8; N],
    len: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Supplied data (len:{0}) won't fit into buffer (len:{1})")]
    InvalidBufSize(usize, usize),
}

impl<const N: usize> core::fmt::Display for String<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> String<N> {
    fn new() -> Self {
        Self {
            buf: [0u8; N],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        if self.len == 0 {
            ""
        } else {
            // Safety:
            // Can only be filled from fmt output (&str pieces)
            // Or i32 which is serialized as utf8
            unsafe { from_utf8_unchecked(&self.buf[..self.len]) }
        }
    }

    /// Renders `args` into a fresh buffer, `format!` without the heap.
    pub fn format(args: core::fmt::Arguments<'_>) -> Result<Self, Error> {
        let mut composer = Composer {
            target: Self::new(),
            needed: 0,
        };
        core::fmt::write(&mut composer, args)
            .map_err(|_| Error::InvalidBufSize(composer.needed, N))?;
        if composer.needed > N {
            return Err(Error::InvalidBufSize(composer.needed, N));
        }

        Ok(composer.target)
    }
}

struct Composer<const N: usize> {
    target: String<N>,
    needed: usize,
}

impl<const N: usize> core::fmt::Write for Composer<N> {
    // Keeps counting past the end so the error can report the full length
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let start = self.needed;
        self.needed += s.len();
        if self.needed <= N {
            self.target.buf[start..self.needed].copy_from_slice(s.as_bytes());
            self.target.len = self.needed;
        }
        Ok(())
    }
}

impl<const N: usize> TryFrom<i32> for String<N> {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let mut s_string = Self::new();
        s_string.len = serialize_i32(value, &mut s_string.buf)?;
        Ok(s_string)
    }
}

impl<const N: usize> AsRef<[u8]> for String<N> {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Writes the decimal form of `num` to the start of `buf`, returns its length.
pub fn serialize_i32(num: i32, buf: &mut [u8]) -> Result<usize, Error> {
    let mut digits = [0u8; 10];
    let mut count = 0;
    // unsigned_abs keeps i32::MIN representable
    let mut abs = num.unsigned_abs();

    loop {
        digits[count] = b'0' + (abs % 10) as u8;
        abs /= 10;
        count += 1;
        if abs == 0 {
            break;
        }
    }

    let sign = usize::from(num.is_negative());
    let len = count + sign;
    if buf.len() < len {
        return Err(Error::InvalidBufSize(len, buf.len()));
    }

    if sign == 1 {
        buf[0] = b'-';
    }
    for (slot, digit) in buf[sign..len].iter_mut().zip(digits[..count].iter().rev()) {
        *slot = *digit;
    }

    Ok(len)
}
