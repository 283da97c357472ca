use core::{fmt, ops};
use core::convert::TryFrom;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

/// Length of the fixed TZSP header.
pub const HEADER_LEN: usize = field::PAYLOAD.start;

/// The maximum number of tagged fields recorded for one datagram.
///
/// Walking the field chain stops after this many fields even if no `END` tag was encountered.
/// Any following bytes are treated as payload.
pub const MAX_FIELDS: usize = 32;

enum_with_unknown! {
    /// The kind of a TZSP datagram.
    pub doc enum PacketType(u8) {
        /// A captured packet with a list of tagged fields.
        ReceivedTagList = 0,
        /// A packet to be transmitted by the sensor.
        PacketForTransmit = 1,
        /// Reserved by the protocol.
        Reserved = 2,
        /// Sensor configuration.
        Configuration = 3,
        /// Keep-alive without payload.
        KeepAlive = 4,
        /// Opens a port on intermediate firewalls.
        PortOpener = 5,
    }
}

enum_with_unknown! {
    /// The link layer of the encapsulated frame.
    pub doc enum Encapsulation(u16) {
        /// Ethernet II frames.
        Ethernet = 1,
        /// Raw IEEE 802.11 frames.
        Ieee80211 = 18,
        /// IEEE 802.11 with a Prism monitoring header.
        PrismHeader = 119,
        /// IEEE 802.11 with an AVS monitoring header.
        WlanAvs = 127,
    }
}

enum_with_unknown! {
    /// The tag of an entry in the tagged field chain.
    ///
    /// Only `Padding` and `End` influence parsing, they are the two control tags without a length
    /// byte. All other tags are followed by a length byte and that many bytes of data.
    pub doc enum Tag(u8) {
        /// A single byte of padding.
        Padding = 0,
        /// Terminates the field chain.
        End = 1,
        /// Received signal strength.
        RawRssi = 10,
        /// Signal to noise ratio.
        Snr = 11,
        /// Data rate of the captured frame.
        DataRate = 12,
        /// Capture timestamp of the sensor.
        Timestamp = 13,
        /// Contention free period indicator.
        ContentionFree = 15,
        /// The frame was decrypted by the sensor.
        Decrypted = 16,
        /// The frame had a frame check sequence error.
        FcsError = 17,
        /// Channel the frame was received on.
        RxChannel = 18,
        /// Per sensor packet counter.
        PacketCount = 40,
        /// Original length of the captured frame.
        RxFrameLength = 41,
        /// Serial number of the sensor radio.
        WlanRadioHdrSerial = 60,
    }
}

/// The four flag bits of a TZSP header.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Flags(u8);

byte_wrapper! {
    /// A byte sequence starting with a TZSP header.
    ///
    /// Only the fixed part of the datagram is accessible through this wrapper. The tagged fields
    /// following it have a variable length, use [`Frame::parse`] to walk them.
    ///
    /// [`Frame::parse`]: struct.Frame.html#method.parse
    tzsp
}

mod field {
    use crate::wire::field::*;

    pub(crate) const VERSION:       usize = 0;
    pub(crate) const TYPE_FLAGS:    usize = 1;
    pub(crate) const ENCAPSULATION: Field = 2..4;
    pub(crate) const PAYLOAD:       Rest  = 4..;
}

/// A high-level representation of a TZSP header.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Repr {
    /// The protocol version, not validated.
    pub version: u8,
    /// Flags describing the rest of the datagram.
    pub flags: Flags,
    /// The type of the datagram.
    ///
    /// Only the low four bits are representable on the wire.
    pub packet_type: PacketType,
    /// The link layer protocol of the payload.
    pub encapsulation: Encapsulation,
}

/// One entry in the tagged field chain.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Field<'a> {
    /// A one byte padding field.
    Padding,
    /// The one byte field terminating the chain.
    End,
    /// A field with a length byte and data.
    Data {
        /// The tag of the field, never `Padding` or `End`.
        tag: Tag,
        /// The data of the field, at most 255 bytes.
        data: &'a [u8],
    },
}

/// The tagged fields of one datagram, in wire order.
///
/// Holds up to [`MAX_FIELDS`] fields without allocating.
///
/// [`MAX_FIELDS`]: constant.MAX_FIELDS.html
#[derive(Clone, Copy)]
pub struct Fields<'a> {
    fields: [Field<'a>; MAX_FIELDS],
    len: usize,
}

/// A parsed TZSP datagram.
///
/// All parts borrow from the received buffer, including the carried payload. Nothing is copied
/// during parsing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    repr: Repr,
    fields: Fields<'a>,
    payload: Option<&'a [u8]>,
}

impl Flags {
    /// No tagged fields follow the header.
    pub const NO_FIELDS: Flags = Flags(0x01);

    /// No payload follows the tagged fields.
    ///
    /// The parser does not act on this flag. A payload is present exactly when bytes remain.
    pub const NO_DATA: Flags = Flags(0x02);

    const MASK: u8 = 0x0f;

    /// Flags with no bit set.
    pub const fn empty() -> Self {
        Flags(0)
    }

    /// Create flags from their wire bits, ignoring bits outside the four bit field.
    pub const fn from_bits(bits: u8) -> Self {
        Flags(bits & Self::MASK)
    }

    /// The wire bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check if all bits of `other` are set.
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if the header announces that no tagged fields follow.
    pub fn no_fields(self) -> bool {
        self.contains(Self::NO_FIELDS)
    }

    /// Check if the header announces that no payload follows.
    pub fn no_data(self) -> bool {
        self.contains(Self::NO_DATA)
    }
}

impl ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, other: Flags) -> Flags {
        Flags(self.0 | other.0)
    }
}

impl tzsp {
    /// Imbue a raw octet buffer with TZSP header structure.
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    /// Imbue a mutable octet buffer with TZSP header structure.
    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    /// Shorthand for a combination of [`new_unchecked`] and [`check_len`].
    ///
    /// [`new_unchecked`]: #method.new_unchecked
    /// [`check_len`]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    /// Mutable variant of [`new_checked`].
    ///
    /// [`new_checked`]: #method.new_checked
    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut Self> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    /// Unwrap the datagram as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap the datagram as a mutable raw byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::TooShort)` if the buffer is shorter than the header.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::TooShort)
        } else {
            Ok(())
        }
    }

    /// Return the version field.
    #[inline]
    pub fn version(&self) -> u8 {
        self.0[field::VERSION]
    }

    /// Return the flag bits, the low nibble of the second byte.
    #[inline]
    pub fn flags(&self) -> Flags {
        Flags::from_bits(self.0[field::TYPE_FLAGS])
    }

    /// Return the packet type, the high nibble of the second byte.
    #[inline]
    pub fn packet_type(&self) -> PacketType {
        PacketType::from(self.0[field::TYPE_FLAGS] >> 4)
    }

    /// Return the encapsulated protocol field.
    #[inline]
    pub fn encapsulation(&self) -> Encapsulation {
        Encapsulation::from(NetworkEndian::read_u16(&self.0[field::ENCAPSULATION]))
    }

    /// Set the version field.
    #[inline]
    pub fn set_version(&mut self, value: u8) {
        self.0[field::VERSION] = value
    }

    /// Set the flag bits, leaving the packet type unchanged.
    #[inline]
    pub fn set_flags(&mut self, value: Flags) {
        let raw = self.0[field::TYPE_FLAGS] & !Flags::MASK;
        self.0[field::TYPE_FLAGS] = raw | value.bits()
    }

    /// Set the packet type, leaving the flags unchanged.
    ///
    /// Only the low four bits of the type are stored.
    #[inline]
    pub fn set_packet_type(&mut self, value: PacketType) {
        let raw = self.0[field::TYPE_FLAGS] & Flags::MASK;
        self.0[field::TYPE_FLAGS] = raw | (u8::from(value) << 4)
    }

    /// Set the encapsulated protocol field.
    #[inline]
    pub fn set_encapsulation(&mut self, value: Encapsulation) {
        NetworkEndian::write_u16(&mut self.0[field::ENCAPSULATION], value.into())
    }

    /// Return everything after the fixed header, tagged fields and payload.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[field::PAYLOAD]
    }

    /// Return everything after the fixed header as a mutable slice.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[field::PAYLOAD]
    }
}

impl AsRef<[u8]> for tzsp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for tzsp {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl Repr {
    /// Parse a TZSP header and return a high-level representation.
    pub fn parse(header: &tzsp) -> Result<Repr> {
        header.check_len()?;

        Ok(Repr {
            version: header.version(),
            flags: header.flags(),
            packet_type: header.packet_type(),
            encapsulation: header.encapsulation(),
        })
    }

    /// Return the length of the header that will be emitted from this representation.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit a high-level representation into a TZSP header.
    pub fn emit(&self, header: &mut tzsp) {
        header.set_version(self.version);
        header.set_flags(self.flags);
        header.set_packet_type(self.packet_type);
        header.set_encapsulation(self.encapsulation);
    }
}

impl<'a> Field<'a> {
    /// Parse the field at the start of `data`, returning it with the bytes after it.
    ///
    /// Fails with `TooShort` if the tag, the length byte or the announced data are not fully
    /// contained in `data`. Any value of the length byte is handled, nothing outside of `data`
    /// is ever read.
    pub fn parse(data: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let (&tag, rest) = data.split_first().ok_or(Error::TooShort)?;
        match Tag::from(tag) {
            Tag::Padding => Ok((Field::Padding, rest)),
            Tag::End => Ok((Field::End, rest)),
            tag => {
                let (&len, rest) = rest.split_first().ok_or(Error::TooShort)?;
                let len = usize::from(len);
                if rest.len() < len {
                    return Err(Error::TooShort);
                }
                let (data, rest) = rest.split_at(len);
                Ok((Field::Data { tag, data }, rest))
            },
        }
    }

    /// The tag of this field.
    pub fn tag(&self) -> Tag {
        match self {
            Field::Padding => Tag::Padding,
            Field::End => Tag::End,
            Field::Data { tag, .. } => *tag,
        }
    }

    /// The data of this field, empty for control fields.
    pub fn data(&self) -> &'a [u8] {
        match self {
            Field::Padding | Field::End => &[],
            Field::Data { data, .. } => *data,
        }
    }

    /// Return the number of bytes this field occupies on the wire.
    pub fn buffer_len(&self) -> usize {
        match self {
            Field::Padding | Field::End => 1,
            Field::Data { data, .. } => 2 + data.len(),
        }
    }

    /// Emit the field at the start of `buffer`.
    ///
    /// # Panics
    /// This function panics if `buffer` is shorter than `buffer_len()`, if the data is longer
    /// than 255 bytes or if a data field carries one of the control tags.
    pub fn emit(&self, buffer: &mut [u8]) {
        match self {
            Field::Padding | Field::End => buffer[0] = self.tag().into(),
            Field::Data { tag, data } => {
                assert!(
                    !matches!(tag, Tag::Padding | Tag::End),
                    "control tag used for a data field");
                let len = u8::try_from(data.len())
                    .expect("tagged field data longer than 255 bytes");
                buffer[0] = (*tag).into();
                buffer[1] = len;
                buffer[2..2 + data.len()].copy_from_slice(data);
            },
        }
    }
}

impl<'a> Fields<'a> {
    /// An empty field list.
    pub fn new() -> Self {
        Fields {
            fields: [Field::Padding; MAX_FIELDS],
            len: 0,
        }
    }

    /// Append a field.
    ///
    /// Returns the field back if the list already holds `MAX_FIELDS` fields.
    pub fn push(&mut self, field: Field<'a>) -> core::result::Result<(), Field<'a>> {
        match self.fields.get_mut(self.len) {
            Some(slot) => {
                *slot = field;
                self.len += 1;
                Ok(())
            },
            None => Err(field),
        }
    }

    /// Check if no further field can be appended.
    pub fn is_full(&self) -> bool {
        self.len == MAX_FIELDS
    }

    /// Return the recorded fields.
    pub fn as_slice(&self) -> &[Field<'a>] {
        &self.fields[..self.len]
    }

    /// Return the number of bytes the fields occupy on the wire.
    pub fn buffer_len(&self) -> usize {
        self.as_slice()
            .iter()
            .map(Field::buffer_len)
            .sum()
    }
}

impl Default for Fields<'_> {
    fn default() -> Self {
        Fields::new()
    }
}

impl<'a> ops::Deref for Fields<'a> {
    type Target = [Field<'a>];

    fn deref(&self) -> &[Field<'a>] {
        self.as_slice()
    }
}

impl PartialEq for Fields<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Fields<'_> {}

impl fmt::Debug for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<'a> Frame<'a> {
    /// Assemble a frame from its parts, for emitting.
    ///
    /// The caller is responsible for consistency with the header flags. Fields are emitted even
    /// when `NO_FIELDS` is set but such a datagram will then not parse back to the same frame.
    pub fn new(repr: Repr, fields: Fields<'a>, payload: Option<&'a [u8]>) -> Self {
        Frame {
            repr,
            fields,
            payload: payload.filter(|payload| !payload.is_empty()),
        }
    }

    /// Parse a complete TZSP datagram.
    ///
    /// The tagged field chain is walked unless the header has the `NO_FIELDS` flag. The walk ends
    /// after an `END` field, which is recorded, or after `MAX_FIELDS` fields. All bytes after the
    /// walk are the payload. The `NO_DATA` flag is not consulted.
    ///
    /// Returns `Err(Error::TooShort)` if the header is incomplete, the datagram ends before the
    /// next expected field, or a field announces more data than remains.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let header = tzsp::new_checked(buffer)?;
        let repr = Repr::parse(header)?;
        let mut rest = header.payload_slice();
        let mut fields = Fields::new();

        if !repr.flags.no_fields() {
            while !fields.is_full() {
                let (field, tail) = Field::parse(rest)?;
                rest = tail;
                let pushed = fields.push(field);
                debug_assert!(pushed.is_ok(), "loop condition checks for space");
                if field == Field::End {
                    break;
                }
            }
        }

        Ok(Frame::new(repr, fields, Some(rest)))
    }

    /// The header of the datagram.
    pub fn repr(&self) -> Repr {
        self.repr
    }

    /// The tagged fields, in wire order.
    pub fn fields(&self) -> &[Field<'a>] {
        self.fields.as_slice()
    }

    /// The encapsulated frame, if any bytes followed the fields.
    pub fn payload(&self) -> Option<&'a [u8]> {
        self.payload
    }

    /// Return the length of the datagram that will be emitted from this frame.
    ///
    /// For a parsed frame this is the length of the parsed buffer.
    pub fn buffer_len(&self) -> usize {
        self.repr.buffer_len()
            + self.fields.buffer_len()
            + self.payload.map_or(0, <[u8]>::len)
    }

    /// Emit header, fields and payload into the start of `buffer`.
    ///
    /// # Panics
    /// This function panics if `buffer` is shorter than `buffer_len()` or any field can not be
    /// emitted.
    pub fn emit(&self, buffer: &mut [u8]) {
        let buffer = &mut buffer[..self.buffer_len()];
        let header = tzsp::new_unchecked_mut(buffer);
        self.repr.emit(header);

        let mut rest = header.payload_mut_slice();
        for field in self.fields() {
            let (head, tail) = core::mem::take(&mut rest).split_at_mut(field.buffer_len());
            field.emit(head);
            rest = tail;
        }

        if let Some(payload) = self.payload {
            rest.copy_from_slice(payload);
        }
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Frame")
            .field("repr", &self.repr)
            .field("fields", &self.fields)
            .field("payload_len", &self.payload.map(<[u8]>::len))
            .finish()
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PacketType::ReceivedTagList => write!(f, "received"),
            PacketType::PacketForTransmit => write!(f, "transmit"),
            PacketType::Reserved => write!(f, "reserved"),
            PacketType::Configuration => write!(f, "configuration"),
            PacketType::KeepAlive => write!(f, "keepalive"),
            PacketType::PortOpener => write!(f, "port-opener"),
            PacketType::Unknown(id) => write!(f, "0x{:x}", id),
        }
    }
}

impl fmt::Display for Encapsulation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Encapsulation::Ethernet => write!(f, "Ethernet"),
            Encapsulation::Ieee80211 => write!(f, "IEEE802.11"),
            Encapsulation::PrismHeader => write!(f, "Prism"),
            Encapsulation::WlanAvs => write!(f, "AVS"),
            Encapsulation::Unknown(id) => write!(f, "0x{:04x}", id),
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TZSP v{} type={} encap={} flags=0x{:x}",
            self.version, self.packet_type, self.encapsulation, self.flags.bits())
    }
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Padding => write!(f, "PAD"),
            Field::End => write!(f, "END"),
            Field::Data { tag: Tag::Unknown(id), data } => write!(f, "tag {} len={}", id, data.len()),
            Field::Data { tag, data } => write!(f, "{:?} len={}", tag, data.len()),
        }
    }
}

impl fmt::Display for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} fields={} payload={}",
            self.repr, self.fields.len, self.payload.map_or(0, <[u8]>::len))
    }
}
