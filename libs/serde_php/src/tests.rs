// round-trips values through both directions and checks the exact output of
// types that are expected to share a representation
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use super::*;
use crate::value::Key;

fn round_trip<T>(value: &T) -> Vec<u8>
where
    T: PartialEq + fmt::Debug + Serialize + serde::de::DeserializeOwned,
{
    let buf = to_vec(value).expect("serializing must work");
    let rev: T = from_slice(&buf).expect("deserializing must work");
    assert_eq!(*value, rev, "serialization messed up data");
    buf
}

fn assert_all_equal(iter: impl IntoIterator<Item = Vec<u8>>) {
    let peek = iter.into_iter();
    let mut peek = peek.peekable();

    while let Some(item) = peek.next() {
        if let Some(next) = peek.peek() {
            assert_eq!(item, *next, "all serialized forms must be equal");
        }
    }
}

fn type_error(err: de::Error) -> de::UnmarshalTypeError {
    match err {
        de::Error::Type(err) => err,
        err => panic!("expected a type error, got {err:?}"),
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Unit;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct NewType(u64);

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Struct {
    a: i32,
    b: u16,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Tuple(i32, u16);

#[derive(Debug, PartialEq, Serialize, Deserialize)]
enum Enum {
    Unit,
    NewType(u64),
    Struct { a: i32, b: u16 },
    Tuple(i32, u16),
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Token {
    access_token: String,
    expires_in: i64,
}

impl PhpClass for Token {
    const CLASS_NAME: &'static str = "token";
}

#[derive(Debug, Default, PartialEq)]
struct Payload(Vec<u8>);

impl PhpClass for Payload {
    const CLASS_NAME: &'static str = "test1";
}

impl SerializePhp for Payload {
    type Error = Infallible;

    fn serialize_php(&self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.0.clone())
    }
}

impl UnserializePhp for Payload {
    const EXPECTED_CLASS: Option<&'static str> = Some("test1");
    type Error = &'static str;

    fn unserialize_php(data: &[u8]) -> Result<Self, Self::Error> {
        if data.is_empty() {
            return Err("empty payload");
        }

        Ok(Self(data.to_vec()))
    }
}

#[derive(Debug, Default, PartialEq)]
struct AnyClass(Vec<u8>);

impl UnserializePhp for AnyClass {
    type Error = Infallible;

    fn unserialize_php(data: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(data.to_vec()))
    }
}

struct Broken;

impl PhpClass for Broken {
    const CLASS_NAME: &'static str = "broken";
}

impl SerializePhp for Broken {
    type Error = &'static str;

    fn serialize_php(&self) -> Result<Vec<u8>, Self::Error> {
        Err("no can do")
    }
}

const TOKEN_OBJECT: &[u8] = b"O:5:\"token\":2:{s:19:\"\0token\0access_token\";s:3:\"xyz\";s:17:\"\0token\0expires_in\";i:5;}";

#[test]
fn round_trip_null() {
    assert_all_equal([
        round_trip(&()),
        round_trip(&None::<i32>),
        round_trip(&Unit),
        b"N;".to_vec(),
    ]);
}

#[test]
fn round_trip_scalars() {
    assert_eq!(round_trip(&true), b"b:1;");
    assert_eq!(round_trip(&false), b"b:0;");
    assert_eq!(round_trip(&0), b"i:0;");
    assert_eq!(round_trip(&-1), b"i:-1;");
    assert_eq!(round_trip(&i64::MIN), b"i:-9223372036854775808;");
    assert_eq!(round_trip(&u64::MAX), b"i:18446744073709551615;");
    assert_eq!(round_trip(&'ß'), "s:2:\"ß\";".as_bytes());
    assert_all_equal([round_trip(&NewType(7)), round_trip(&7u64)]);
}

#[test]
fn round_trip_floats() {
    let values = [
        0.0,
        -0.0,
        1.0,
        1.1,
        0.1 + 0.2,
        -1.5e-7,
        123_456_789.123,
        1e21,
        f64::MAX,
        f64::MIN_POSITIVE,
        5e-324,
    ];

    for v in values {
        let buf = to_vec(&v).expect("serializing must work");
        let rev: f64 = from_slice(&buf).expect("deserializing must work");
        assert_eq!(v.to_bits(), rev.to_bits(), "{v:?} must round-trip exactly");
    }

    assert_eq!(round_trip(&1.1f32), b"d:1.1;");
}

#[test]
fn round_trip_strings() {
    assert_all_equal([
        round_trip(&"hallo".to_owned()),
        round_trip(&ByteBuf::from(b"hallo".to_vec())),
        b"s:5:\"hallo\";".to_vec(),
    ]);

    assert_eq!(round_trip(&"öäüÖÄÜ".to_owned()), "s:12:\"öäüÖÄÜ\";".as_bytes());
    assert_eq!(
        round_trip(&ByteBuf::from(vec![0xff, 0, b'"', b';'])),
        b"s:4:\"\xff\0\";\";"
    );
}

#[test]
fn round_trip_lists() {
    assert_all_equal([
        round_trip(&(87654321, 54321)),
        round_trip(&[87654321, 54321]),
        round_trip(&vec![87654321, 54321]),
        round_trip(&Tuple(87654321, 54321)),
        b"a:2:{i:0;i:87654321;i:1;i:54321;}".to_vec(),
    ]);

    assert_eq!(round_trip(&Vec::<String>::new()), b"a:0:{}");
}

#[test]
fn round_trip_maps() {
    assert_all_equal([
        round_trip(&Struct { a: 1, b: 2 }),
        round_trip(&BTreeMap::from([("a".to_owned(), 1), ("b".to_owned(), 2)])),
        b"a:2:{s:1:\"a\";i:1;s:1:\"b\";i:2;}".to_vec(),
    ]);
}

#[test]
fn round_trip_enum() {
    assert_eq!(round_trip(&Enum::Unit), b"s:4:\"Unit\";");
    assert_eq!(round_trip(&Enum::NewType(5)), b"a:1:{s:7:\"NewType\";i:5;}");
    assert_eq!(
        round_trip(&Enum::Tuple(1, 2)),
        b"a:1:{s:5:\"Tuple\";a:2:{i:0;i:1;i:1;i:2;}}"
    );
    assert_eq!(
        round_trip(&Enum::Struct { a: 1, b: 2 }),
        b"a:1:{s:6:\"Struct\";a:2:{s:1:\"a\";i:1;s:1:\"b\";i:2;}}"
    );

    let res = from_slice::<Enum>(b"i:1;").expect_err("integers are not variants");
    assert_eq!(type_error(res).expected(), "Enum");
}

#[test]
fn dynamic_sequence() {
    let value = Value::Array(vec![
        Value::Int(1),
        Value::Float(1.1),
        Value::from("hallo"),
        Value::Null,
        Value::Bool(true),
        Value::Array(Vec::new()),
    ]);

    let buf = to_vec(&value).expect("serializing must work");
    assert_eq!(
        buf,
        b"a:6:{i:0;i:1;i:1;d:1.1;i:2;s:5:\"hallo\";i:3;N;i:4;b:1;i:5;a:0:{}}"
    );

    let rev: Value = from_slice(&buf).expect("deserializing must work");
    assert_eq!(rev, value, "dynamic decode must reconstruct the sequence");

    let long = b"a:6:{i:0;i:1;i:1;d:1.100000000000000088817841970012523233890533447265625;i:2;s:5:\"hallo\";i:3;N;i:4;b:1;i:5;a:0:{}}";
    let rev: Value = from_slice(long).expect("deserializing must work");
    assert_eq!(rev, value, "long float text must parse to the same value");
}

#[test]
fn dynamic_map() {
    let value: Value = from_slice(b"a:2:{i:1;s:1:\"b\";i:0;s:1:\"a\";}").expect("valid input");
    let map = value.as_map().expect("out of order keys make a map");
    let keys: Vec<_> = map.keys().cloned().collect();
    assert_eq!(keys, [Key::Int(1), Key::Int(0)], "source order is kept");

    let value: Value = from_slice(b"a:2:{s:1:\"k\";i:1;i:0;b:0;}").expect("valid input");
    assert_eq!(value.get("k").and_then(Value::as_i64), Some(1));

    let value: Value = from_slice(b"s:2:\"\xff\xfe\";").expect("valid input");
    assert_eq!(value, Value::Bytes(vec![0xff, 0xfe]), "invalid utf-8 stays bytes");

    let value: Value = from_slice(b"a:1:{s:2:\"\xff!\";N;}").expect("valid input");
    let map = value.as_map().expect("string keys make a map");
    assert!(
        map.contains_key(&Key::String("\u{fffd}!".to_owned())),
        "invalid utf-8 keys are converted lossily"
    );
}

#[test]
fn dynamic_custom_is_mismatch() {
    let res = from_slice::<Value>(b"C:5:\"test1\":3:{abc}").expect_err("custom needs a hook");
    assert_eq!(type_error(res).expected(), "dynamic value");
}

#[test]
fn object_into_struct() {
    let token: Token = from_slice(TOKEN_OBJECT).expect("deserializing must work");
    assert_eq!(
        token,
        Token {
            access_token: "xyz".to_owned(),
            expires_in: 5,
        }
    );
}

#[test]
fn object_into_map() {
    let map: HashMap<String, String> = from_slice(TOKEN_OBJECT).expect("deserializing must work");
    assert_eq!(map.get("access_token").map(String::as_str), Some("xyz"));
    assert_eq!(map.get("expires_in").map(String::as_str), Some("5"));
    assert_eq!(map.len(), 2, "prefixed keys must not remain");

    let protected = b"O:1:\"A\":1:{s:4:\"\0*\0x\";i:1;}";
    let map: HashMap<String, i32> = from_slice(protected).expect("deserializing must work");
    assert_eq!(map.get("x"), Some(&1), "protected prefix is stripped");
}

#[test]
fn object_round_trip() {
    let token = Object(Token {
        access_token: "xyz".to_owned(),
        expires_in: 5,
    });

    let buf = round_trip(&token);
    assert_eq!(
        buf,
        b"O:5:\"token\":2:{s:12:\"access_token\";s:3:\"xyz\";s:10:\"expires_in\";i:5;}"
    );
}

#[test]
fn object_into_sequence_is_mismatch() {
    let data = b"O:1:\"A\":1:{i:0;i:1;}";
    let mut out = vec![9];
    let res = from_slice_into(data, &mut out).expect_err("objects are not sequences");
    assert_eq!(type_error(res).expected(), "sequence");
    assert!(out.is_empty(), "mismatch leaves the zero value");
}

#[test]
fn custom_payload() {
    let Custom(payload) =
        from_slice::<Custom<Payload>>(b"C:5:\"test1\":3:{abc}").expect("deserializing must work");
    assert_eq!(payload.0, b"abc", "hook gets exactly the blob");

    let buf = to_vec(&Custom(payload)).expect("serializing must work");
    assert_eq!(buf, b"C:5:\"test1\":3:{abc}");

    let Custom(any) =
        from_slice::<Custom<AnyClass>>(b"C:3:\"xyz\":2:{{}}").expect("any class is accepted");
    assert_eq!(any.0, b"{}");

    let Custom(null) = from_slice::<Custom<Payload>>(b"N;").expect("null is the default");
    assert_eq!(null, Payload::default());
}

#[test]
fn custom_class_mismatch() {
    let mut out = Custom(Payload(b"old".to_vec()));
    let res = from_slice_into(b"C:5:\"other\":3:{abc}", &mut out).expect_err("class must match");
    assert_eq!(type_error(res).offset(), 0);
    assert_eq!(out.0, Payload::default(), "hook must not run");
}

#[test]
fn custom_length_mismatch() {
    let res = from_slice::<Custom<Payload>>(b"C:5:\"test1\":4:{abc}").expect_err("blob is short");
    assert!(matches!(res, de::Error::Syntax(_)), "got {res:?}");
}

#[test]
fn custom_hook_errors() {
    let res = from_slice::<Custom<Payload>>(b"C:5:\"test1\":0:{}").expect_err("hook rejects");
    assert!(
        matches!(&res, de::Error::Marshaler { class, .. } if class == "test1"),
        "got {res:?}"
    );

    let res = to_vec(&Custom(Broken)).expect_err("hook rejects");
    assert!(
        matches!(&res, ser::Error::Marshaler { class: "broken", message } if message == "no can do"),
        "got {res:?}"
    );
}

#[test]
fn error_continuation() {
    let data = b"a:3:{i:0;i:1;i:1;s:1:\"x\";i:2;i:3;}";
    let mut out = Vec::<i32>::new();
    let res = from_slice_into(data, &mut out).expect_err("one element is a string");
    assert_eq!(out, [1, 0, 3], "other elements must be populated");

    let err = type_error(res);
    assert_eq!(err.value(), "string");
    assert_eq!(err.expected(), "i32");
    assert_eq!(err.offset(), 17);
    assert_eq!(err.field(), "1");
}

#[test]
fn first_error_wins() {
    let data = b"a:2:{i:0;b:1;i:1;s:1:\"x\";}";
    let res = from_slice::<Vec<i32>>(data).expect_err("both elements mismatch");
    assert_eq!(type_error(res).value(), "bool");
}

#[test]
fn error_field_path() {
    #[derive(Debug, Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        inner: Struct,
    }

    let data = b"a:1:{s:5:\"inner\";a:2:{s:1:\"a\";i:1;s:1:\"b\";i:70000;}}";
    let err = type_error(from_slice::<Outer>(data).expect_err("b overflows u16"));
    assert_eq!(err.field(), "inner.b");
    assert_eq!(err.value(), "integer 70000");
    assert_eq!(
        err.to_string(),
        "cannot unmarshal integer 70000 into field `inner.b` of type u16 at offset 42"
    );

    let err = type_error(from_slice::<u8>(b"s:1:\"x\";").expect_err("text is not a byte"));
    assert_eq!(err.to_string(), "cannot unmarshal string into u8 at offset 0");
}

#[test]
fn scalar_coercion() {
    assert_eq!(from_slice::<String>(b"i:42;").expect("ints are text"), "42");
    assert_eq!(from_slice::<String>(b"d:1.5;").expect("floats are text"), "1.5");
    assert_eq!(from_slice::<i32>(b"d:3.9;").expect("floats truncate"), 3);
    assert_eq!(from_slice::<i32>(b"d:-3.9;").expect("floats truncate"), -3);
    assert_eq!(from_slice::<f64>(b"i:2;").expect("ints widen"), 2.0);
    assert_eq!(from_slice::<Vec<u8>>(b"a:1:{i:0;i:255;}").expect("in range"), [255]);

    let res = from_slice::<u8>(b"i:300;").expect_err("overflow");
    assert_eq!(type_error(res).expected(), "u8");

    let res = from_slice::<f32>(b"d:1E+300;").expect_err("overflow");
    assert_eq!(type_error(res).expected(), "f32");

    let res = from_slice::<bool>(b"i:1;").expect_err("ints aren't bools");
    assert_eq!(type_error(res).expected(), "bool");
}

#[test]
fn null_is_zero() {
    assert_eq!(from_slice::<i32>(b"N;").expect("null is zero"), 0);
    assert_eq!(from_slice::<String>(b"N;").expect("null is zero"), "");
    assert_eq!(from_slice::<Vec<i32>>(b"N;").expect("null is zero"), Vec::<i32>::new());
    assert_eq!(from_slice::<Struct>(b"N;").expect("null is zero"), Struct::default());
    assert_eq!(from_slice::<Option<i32>>(b"N;").expect("null is none"), None);
}

#[test]
fn map_key_coercion() {
    let data = b"a:2:{s:1:\"1\";b:1;i:2;b:0;}";

    let map: BTreeMap<i32, bool> = from_slice(data).expect("numeric keys");
    assert_eq!(map, BTreeMap::from([(1, true), (2, false)]));

    let map: BTreeMap<String, bool> = from_slice(data).expect("string keys");
    assert_eq!(
        map,
        BTreeMap::from([("1".to_owned(), true), ("2".to_owned(), false)])
    );

    let buf = to_vec(&map).expect("serializing must work");
    assert_eq!(buf, b"a:2:{s:1:\"1\";b:1;s:1:\"2\";b:0;}");
    let map: BTreeMap<i32, bool> = from_slice(&buf).expect("string keys read back as ints");
    assert_eq!(map.len(), 2, "both keys must parse");
}

#[test]
fn unknown_and_missing_fields() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Partial {
        a: i32,
        #[serde(default)]
        b: u16,
    }

    let data = b"a:2:{s:1:\"a\";i:1;s:5:\"extra\";a:1:{i:0;N;}}";
    let value: Partial = from_slice(data).expect("extra keys are skipped");
    assert_eq!(value, Partial { a: 1, b: 0 });
}

#[test]
fn sequence_keys() {
    let data = b"a:2:{i:1;s:1:\"b\";i:0;s:1:\"a\";}";
    let list: Vec<String> = from_slice(data).expect("keys give the position");
    assert_eq!(list, ["a", "b"]);

    let data = b"a:2:{i:0;s:1:\"a\";i:5;s:1:\"b\";}";
    let list: Vec<String> = from_slice(data).expect("out of range keys are dropped");
    assert_eq!(list, ["a", ""]);

    let res = from_slice::<Vec<i32>>(b"a:1:{s:1:\"a\";i:1;}").expect_err("string key");
    assert!(matches!(res, de::Error::NonIntegerIndex(5)), "got {res:?}");
}

#[test]
fn fixed_size_sequences() {
    let short: (i32, i32) = from_slice(b"a:1:{i:0;i:5;}").expect("short tuples are filled");
    assert_eq!(short, (5, 0));

    let long: [i32; 2] = from_slice(b"a:3:{i:0;i:1;i:1;i:2;i:2;i:3;}").expect("excess is skipped");
    assert_eq!(long, [1, 2]);
}

#[test]
fn depth_limit() {
    let depth = de::MAX_DEPTH + 1;
    let mut data = b"a:1:{i:0;".repeat(depth);
    data.extend_from_slice(b"N;");
    data.extend(std::iter::repeat_n(b'}', depth));

    assert!(is_valid(&data), "the input itself is fine");
    let res = from_slice::<Value>(&data).expect_err("too deep");
    assert!(matches!(res, de::Error::DepthLimitExceeded(_)), "got {res:?}");
}

#[test]
fn syntax_errors() {
    let res = from_slice::<i32>(b"i:1;i:2;").expect_err("trailing value");
    match res {
        de::Error::Syntax(err) => assert_eq!(err.offset(), 4, "offset of trailing byte"),
        _ => panic!("incorrect error kind: {res:?}"),
    }

    let res = from_slice::<Value>(b"a:1:{i:0;i:1;").expect_err("missing brace");
    assert!(
        matches!(&res, de::Error::Syntax(err) if err.is_eof()),
        "got {res:?}"
    );

    let res = from_slice::<Value>(b"a:1:{i:0;r:1;}").expect_err("references");
    assert!(matches!(res, de::Error::Syntax(_)), "got {res:?}");
}

#[test]
fn text_fields() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Host {
        #[serde(with = "crate::text")]
        id: u64,
        #[serde(with = "crate::text")]
        port: u16,
    }

    let host = Host { id: 7, port: 80 };

    let buf = round_trip(&host);
    assert_eq!(
        buf,
        b"a:2:{s:2:\"id\";s:1:\"7\";s:4:\"port\";s:2:\"80\";}"
    );

    let host: Host = from_slice(b"a:2:{s:2:\"id\";s:1:\"7\";s:4:\"port\";i:80;}")
        .expect("integers parse from their text");
    assert_eq!(host.port, 80);

    let res = from_slice::<Host>(b"a:2:{s:2:\"id\";s:3:\"bad\";s:4:\"port\";i:80;}")
        .expect_err("unparsable text");
    assert!(matches!(res, de::Error::Custom(_)), "got {res:?}");
}

#[test]
fn null_text_field_is_default() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Host {
        #[serde(with = "crate::text")]
        port: u16,
    }

    let host: Host = from_slice(b"a:1:{s:4:\"port\";N;}").expect("null is the default");
    assert_eq!(host, Host { port: 0 });

    let host: Host = from_slice(b"a:1:{s:4:\"port\";s:4:\"8080\";}").expect("valid port");
    assert_eq!(host, Host { port: 8080 });
}

#[test]
fn raw_values() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Envelope {
        id: i32,
        body: Raw,
    }

    let data = b"a:2:{s:2:\"id\";i:1;s:4:\"body\";a:1:{i:0;O:1:\"X\":0:{}}}";
    let env: Envelope = from_slice(data).expect("deserializing must work");
    assert_eq!(env.body.as_bytes(), b"a:1:{i:0;O:1:\"X\":0:{}}");
    assert_eq!(round_trip(&env), data);

    let inner: Value = env.body.decode().expect("raw holds a valid value");
    assert_eq!(inner.as_array().map(<[Value]>::len), Some(1));

    assert_eq!(to_vec(&Raw::default()).expect("empty raw is null"), b"N;");
    assert!(Raw::new(b"i:1".to_vec()).is_err(), "raw must be one value");
    assert!(Raw::new(b"i:1;i:2;".to_vec()).is_err(), "raw must be one value");
}

#[test]
fn float_precision() {
    let options = ser::Options::default().with_float_precision(17);
    let buf = to_vec_with_options(&vec![0.1], options).expect("serializing must work");
    assert_eq!(buf, b"a:1:{i:0;d:0.10000000000000001;}");

    let rev: Vec<f64> = from_slice(&buf).expect("deserializing must work");
    assert_eq!(rev, [0.1], "17 digits always round-trip");
}

#[test]
fn value_map_keys_are_sorted() {
    let mut map = IndexMap::new();
    map.insert(Key::from("b"), Value::Int(2));
    map.insert(Key::Int(10), Value::Int(10));
    map.insert(Key::from("a"), Value::Int(1));

    let buf = to_vec(&Value::Map(map)).expect("serializing must work");
    assert_eq!(buf, b"a:3:{s:2:\"10\";i:10;s:1:\"a\";i:1;s:1:\"b\";i:2;}");
}

#[test]
fn recursive_struct() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Node {
        value: i32,
        children: Vec<Node>,
    }

    let tree = Node {
        value: 1,
        children: vec![Node {
            value: 2,
            children: Vec::new(),
        }],
    };

    let buf = round_trip(&tree);
    assert_eq!(
        buf,
        b"a:2:{s:5:\"value\";i:1;s:8:\"children\";a:1:{i:0;a:2:{s:5:\"value\";i:2;s:8:\"children\";a:0:{}}}}"
    );
}

#[test]
fn nested_dynamic_value() {
    let mut inner = IndexMap::new();
    inner.insert(Key::from("k"), Value::Array(vec![Value::Int(1), Value::Null]));

    let value = Value::Array(vec![Value::Map(inner), Value::Array(Vec::new())]);
    let buf = round_trip(&value);
    assert_eq!(buf, b"a:2:{i:0;a:1:{s:1:\"k\";a:2:{i:0;i:1;i:1;N;}}i:1;a:0:{}}");
}

#[test]
fn objects_with_list_keys_are_arrays() {
    let value: Value = from_slice(b"O:8:\"stdClass\":0:{}").expect("deserializing must work");
    assert_eq!(value, Value::Array(Vec::new()));

    let value: Value =
        from_slice(b"O:1:\"A\":2:{i:0;s:1:\"x\";i:1;b:1;}").expect("deserializing must work");
    assert_eq!(value, Value::Array(vec![Value::from("x"), Value::Bool(true)]));
}

#[test]
fn enum_shape_mismatch_is_fatal() {
    let res = from_slice::<Enum>(b"a:2:{s:4:\"Unit\";N;s:7:\"NewType\";i:1;}")
        .expect_err("a variant is a single pair");
    assert_eq!(type_error(res).expected(), "Enum");

    let res = from_slice::<Vec<Enum>>(b"a:2:{i:0;b:1;i:1;s:4:\"Unit\";}").expect_err("bool variant");
    assert!(matches!(res, de::Error::Type(_)), "got {res:?}");
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Inner {
    z: i32,
    b: i32,
}

#[test]
fn flattened_fields_keep_order() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Outer {
        a: i32,
        #[serde(flatten)]
        inner: Inner,
        c: i32,
    }

    let outer = Outer {
        a: 1,
        inner: Inner { z: 2, b: 3 },
        c: 4,
    };

    let buf = round_trip(&outer);
    assert_eq!(buf, b"a:4:{s:1:\"a\";i:1;s:1:\"z\";i:2;s:1:\"b\";i:3;s:1:\"c\";i:4;}");
}

#[test]
fn flattened_none_is_omitted() {
    #[derive(Debug, PartialEq, Serialize)]
    struct Outer {
        a: i32,
        #[serde(flatten)]
        inner: Option<Inner>,
    }

    let buf = to_vec(&Outer { a: 1, inner: None }).expect("serializing must work");
    assert_eq!(buf, b"a:1:{s:1:\"a\";i:1;}");

    let outer = Outer {
        a: 1,
        inner: Some(Inner { z: 2, b: 3 }),
    };
    let buf = to_vec(&outer).expect("serializing must work");
    assert_eq!(buf, b"a:3:{s:1:\"a\";i:1;s:1:\"z\";i:2;s:1:\"b\";i:3;}");
}

#[test]
fn empty_fields_can_be_skipped() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tagged {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
    }

    let tagged = Tagged {
        name: "x".to_owned(),
        tags: Vec::new(),
    };
    assert_eq!(round_trip(&tagged), b"a:1:{s:4:\"name\";s:1:\"x\";}");

    let tagged = Tagged {
        name: "x".to_owned(),
        tags: vec!["t".to_owned()],
    };
    assert_eq!(
        round_trip(&tagged),
        b"a:2:{s:4:\"name\";s:1:\"x\";s:4:\"tags\";a:1:{i:0;s:1:\"t\";}}"
    );
}
