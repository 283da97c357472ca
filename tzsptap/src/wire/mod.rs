/*! Low-level datagram access and construction.

# Representations

The `wire` module deals with the datagram *representation*, in the same three levels for each
format:

 * The lowercase byte wrapper, here [`tzsp_header`], extracts fields from a sequence of octets and
   inserts them into one. Its accessors do not panic once `check_len` returned `Ok(())`.
 * The `Repr` family, here [`TzspRepr`], is a compact, high-level representation of the header
   that can be parsed from and emitted into octets.
 * The borrowing [`TzspFrame`] is a complete parse of one datagram: header, tagged fields and
   the carried payload, all pointing into the received buffer.

[`tzsp_header`]: struct.tzsp_header.html
[`TzspRepr`]: struct.TzspRepr.html
[`TzspFrame`]: struct.TzspFrame.html

When parsing untrusted input the checked constructors or `TzspFrame::parse` are *necessary*. The
`Repr::parse()` and `Frame::parse()` methods never panic, whatever the content of the buffer. The
`emit()` methods never panic as long as the buffer is at least `buffer_len()` octets long.

# Examples

To emit a datagram into an octet buffer, and then parse it back:

```rust
use tzsptap::wire::*;

let repr = TzspRepr {
    version: 1,
    flags: TzspFlags::empty(),
    packet_type: TzspPacketType::ReceivedTagList,
    encapsulation: TzspEncapsulation::Ethernet,
};
let mut fields = TzspFields::new();
fields.push(TzspField::Data { tag: TzspTag::RxChannel, data: &[6] }).unwrap();
fields.push(TzspField::End).unwrap();
let frame = TzspFrame::new(repr, fields, Some(&[0xaa; 14][..]));

let mut buffer = vec![0; frame.buffer_len()];
frame.emit(&mut buffer);

let parsed = TzspFrame::parse(&buffer)
    .expect("truncated datagram");
assert_eq!(parsed, frame);
```
*/

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
    pub(crate) type Rest  = ::core::ops::RangeFrom<usize>;
}

mod error;
mod tzsp;

pub use self::error::{
    Error,
    Result};

pub use self::tzsp::{
    tzsp as tzsp_header,
    Encapsulation as TzspEncapsulation,
    Field as TzspField,
    Fields as TzspFields,
    Flags as TzspFlags,
    Frame as TzspFrame,
    PacketType as TzspPacketType,
    Repr as TzspRepr,
    Tag as TzspTag,
    HEADER_LEN as TZSP_HEADER_LEN,
    MAX_FIELDS as TZSP_MAX_FIELDS};
