use super::*;
use crate::errors::EvalErrorKind;
use num_bigint::BigInt;
use num_rational::BigRational;
use pretty_assertions::assert_eq;
use quasi_ir::{BinaryOp, UnaryOp};

fn exact(num: i64, den: i64) -> Constant {
    Constant::Float(Real::Exact(BigRational::new(BigInt::from(num), BigInt::from(den))))
}

fn approx(v: f64) -> Constant {
    Constant::Float(Real::Approx(v))
}

fn as_f64(c: &Constant) -> f64 {
    match c.default_value() {
        Ok(Value::Float(f)) => f.get(),
        other => panic!("expected float64, got {other:?}"),
    }
}

mod ints {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrap_to_width() {
        assert_eq!(IntValue::new(IntKind::Int8, 200).get(), -56);
        assert_eq!(IntValue::new(IntKind::Uint8, -1).get(), 255);
        assert_eq!(IntValue::new(IntKind::Int64, i128::from(i64::MAX) + 1).get(), i128::from(i64::MIN));
    }

    #[test]
    fn arithmetic_wraps() {
        let max = IntValue::new(IntKind::Int8, 127);
        assert_eq!(max.add(IntValue::new(IntKind::Int8, 1)).get(), -128);
        let zero = IntValue::new(IntKind::Uint16, 0);
        assert_eq!(zero.sub(IntValue::new(IntKind::Uint16, 1)).get(), 65535);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let x = IntValue::new(IntKind::Int, 7);
        let err = x.quo(IntValue::new(IntKind::Int, 0)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
        assert!(x.rem(IntValue::new(IntKind::Int, 0)).is_err());
    }

    #[test]
    fn cast_keeps_value_when_representable() {
        let v = IntValue::new(IntKind::Int16, -300);
        assert_eq!(v.cast(IntKind::Int64).get(), -300);
        assert_eq!(v.cast(IntKind::Int8).get(), -44);
    }
}

mod constants {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exact_floats_round_once() {
        let sum = Constant::binary(BinaryOp::Add, &exact(1, 10), &exact(2, 10), Precision::Exact).unwrap();
        let third = Constant::binary(BinaryOp::Quo, &sum, &Constant::int(3), Precision::Exact).unwrap();
        assert_eq!(as_f64(&third), 0.1);
    }

    #[test]
    fn approximate_floats_round_every_step() {
        let sum = Constant::binary(BinaryOp::Add, &approx(0.1), &approx(0.2), Precision::Approx).unwrap();
        let third = Constant::binary(BinaryOp::Quo, &sum, &Constant::int(3), Precision::Approx).unwrap();
        assert_eq!(as_f64(&third), (0.1 + 0.2) / 3.0);
        assert!(as_f64(&third) != 0.1);
    }

    #[test]
    fn promotion_of_int_and_rune() {
        let rune = Constant::Rune(BigInt::from(65));
        let exact_sum = Constant::binary(BinaryOp::Add, &Constant::int(1), &rune, Precision::Exact).unwrap();
        assert_eq!(exact_sum, Constant::Rune(BigInt::from(66)));
        let approx_sum = Constant::binary(BinaryOp::Add, &Constant::int(1), &rune, Precision::Approx).unwrap();
        assert_eq!(approx_sum, Constant::Int(BigInt::from(66)));
    }

    #[test]
    fn integer_constants_are_unbounded() {
        let big = Constant::shift(BinaryOp::Shl, &Constant::int(1), 100).unwrap();
        let back = Constant::shift(BinaryOp::Shr, &big, 98).unwrap();
        assert_eq!(back, Constant::int(4));
        assert_eq!(
            big.to_typed(&Type::Int(IntKind::Uint64), false).unwrap_err().message,
            "constant 1267650600228229401496703205376 overflows uint64"
        );
    }

    #[test]
    fn float_shift_is_rejected() {
        let err = Constant::shift(BinaryOp::Shl, &approx(1.5), 2).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    }

    #[test]
    fn representability() {
        let c = Constant::int(300);
        assert!(c.to_typed(&Type::Int(IntKind::Int8), false).is_err());
        assert_eq!(c.to_typed(&Type::Int(IntKind::Int16), false).unwrap(), Value::typed_int(IntKind::Int16, 300));
        let err = exact(1, 2).to_typed(&Type::INT, false).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
        // integral floats convert
        assert_eq!(exact(8, 2).to_typed(&Type::INT, false).unwrap(), Value::int(4));
    }

    #[test]
    fn explicit_string_conversion() {
        let a = Constant::int(65);
        assert_eq!(a.to_typed(&Type::String, true).unwrap(), Value::string("A"));
        assert!(a.to_typed(&Type::String, false).is_err());
    }

    #[test]
    fn interface_context_uses_default_type() {
        let v = Constant::Rune(BigInt::from(120)).to_typed(&Type::any(), false).unwrap();
        assert_eq!(v, Value::typed_int(IntKind::Int32, 120));
    }

    #[test]
    fn mismatched_kinds() {
        let err = Constant::binary(
            BinaryOp::Add,
            &Constant::String("a".into()),
            &Constant::int(1),
            Precision::Exact,
        )
        .unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::InvalidOperation { .. }));
    }

    #[test]
    fn unary() {
        assert_eq!(Constant::unary(UnaryOp::Neg, &Constant::int(5)).unwrap(), Constant::int(-5));
        assert_eq!(Constant::unary(UnaryOp::Xor, &Constant::int(0)).unwrap(), Constant::int(-1));
        assert_eq!(Constant::unary(UnaryOp::Not, &Constant::Bool(true)).unwrap(), Constant::Bool(false));
        assert!(Constant::unary(UnaryOp::Not, &Constant::int(1)).is_err());
    }

    #[test]
    fn precision_conversion() {
        let c = exact(1, 4).with_precision(Precision::Approx);
        assert_eq!(c, approx(0.25));
        assert_eq!(approx(0.5).with_precision(Precision::Exact), exact(1, 2));
    }
}

mod formatting {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn floats() {
        assert_eq!(format_float(3.5, FloatKind::F64), "3.5");
        assert_eq!(format_float(100_000.0, FloatKind::F64), "100000");
        assert_eq!(format_float(1e21, FloatKind::F64), "1e+21");
        assert_eq!(format_float(1e-6, FloatKind::F64), "1e-06");
        assert_eq!(format_float(f64::INFINITY, FloatKind::F64), "+Inf");
        assert_eq!(format_float(0.1, FloatKind::F32), "0.1");
    }

    #[test]
    fn complex() {
        assert_eq!(format_complex(1.0, 2.0, FloatKind::F64), "(1+2i)");
        assert_eq!(format_complex(0.0, -1.5, FloatKind::F64), "(0-1.5i)");
    }

    #[test]
    fn composites() {
        let s = Value::Slice(SliceValue::from_vec(Type::INT, vec![Value::int(1), Value::int(2)]));
        assert_eq!(s.to_string(), "[1 2]");
        let m = MapValue::new(Type::String, Type::INT);
        m.insert(Value::string("a"), Value::int(1)).unwrap();
        assert_eq!(Value::Map(m).to_string(), "map[a:1]");
        assert_eq!(Value::Nil.to_string(), "<nil>");
        assert_eq!(Value::zero(&Type::pointer(Type::INT)).to_string(), "<nil>");
    }
}

mod semantics {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_values() {
        assert_eq!(Value::zero(&Type::INT), Value::int(0));
        assert_eq!(Value::zero(&Type::String), Value::string(""));
        assert!(Value::zero(&Type::slice(Type::INT)).is_nil());
        assert!(Value::zero(&Type::map(Type::INT, Type::INT)).is_nil());
        assert_eq!(Value::zero(&Type::any()), Value::Nil);
        let arr = Value::zero(&Type::array(2, Type::Bool));
        assert_eq!(arr.to_string(), "[false false]");
    }

    #[test]
    fn arrays_copy_slices_alias() {
        let arr = Value::Array(ArrayValue::new(Type::INT, vec![Value::int(1)]));
        let copy = arr.copied();
        if let Value::Array(a) = &arr {
            a.cells.write()[0] = Value::int(9);
        }
        assert_eq!(copy.to_string(), "[1]");

        let slice = SliceValue::from_vec(Type::INT, vec![Value::int(1), Value::int(2)]);
        let alias = Value::Slice(slice.clone()).copied();
        slice.place(1).unwrap().store(Value::int(7));
        assert_eq!(alias.to_string(), "[1 7]");
    }

    #[test]
    fn slice_append_reuses_capacity() {
        let zero = Value::int(0);
        let base = SliceValue::with_len(Type::INT, 1, 4, &zero);
        let grown = base.append(vec![Value::int(5)]);
        assert_eq!(grown.len(), 2);
        assert_eq!(grown.cap(), 4);
        // shares storage with `base`
        base.reslice(0, 2, 4).unwrap().place(1).unwrap().store(Value::int(6));
        assert_eq!(grown.get(1), Some(Value::int(6)));
    }

    #[test]
    fn reslice_beyond_capacity_fails() {
        let s = SliceValue::from_vec(Type::INT, vec![Value::int(1)]);
        assert!(s.reslice(0, 2, 2).is_err());
    }

    #[test]
    fn map_keys_keep_dynamic_type() {
        let m = MapValue::new(Type::any(), Type::String);
        m.insert(Value::int(1), Value::string("int")).unwrap();
        m.insert(Value::typed_int(IntKind::Int8, 1), Value::string("int8")).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(&Value::int(1)).unwrap(), Some(Value::string("int")));
    }

    #[test]
    fn nil_map_rejects_insert() {
        let m = MapValue::nil(Type::String, Type::INT);
        assert!(m.insert(Value::string("k"), Value::int(1)).is_err());
        assert_eq!(m.get(&Value::string("k")).unwrap(), None);
    }

    #[test]
    fn dynamic_types() {
        assert_eq!(Value::int(1).type_of(), Type::INT);
        assert_eq!(Value::Untyped(Constant::int(1)).type_of(), Type::Untyped(UntypedKind::Int));
        assert_eq!(Value::Nil.type_of(), Type::Untyped(UntypedKind::Nil));
        assert_eq!(Value::float32(1.5).type_of(), Type::Float(FloatKind::F32));
    }

    #[test]
    fn buffered_channel() {
        let ch = Channel::new(2);
        ch.send(Value::int(1)).unwrap();
        ch.send(Value::int(2)).unwrap();
        assert_eq!(ch.len(), 2);
        ch.close().unwrap();
        assert!(ch.send(Value::int(3)).is_err());
        assert_eq!(ch.recv(), Some(Value::int(1)));
        assert_eq!(ch.recv(), Some(Value::int(2)));
        assert_eq!(ch.recv(), None);
        assert!(ch.close().is_err());
    }
}
