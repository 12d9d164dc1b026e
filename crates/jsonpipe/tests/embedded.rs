#![allow(missing_docs, non_snake_case, dead_code)]

use jsonpipe::{Error, decode_struct, unmarshal};

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Embed0 {
        pub Level1a: i32,
        pub Level1b: i32,
        pub Level1c: i32,
        pub Level1d: i32,
        pub Level1e: i32 = "x",
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Embed0a {
        pub Level1a: i32 = "Level1a,omitempty",
        pub Level1b: i32 = "LEVEL1B,omitempty",
        pub Level1c: i32 = "-",
        pub Level1d: i32,
        pub Level1f: i32 = "x",
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Embed0b {
        pub Level1a: i32,
        pub Level1b: i32,
        pub Level1c: i32,
        pub Level1d: i32,
        pub Level1e: i32 = "x",
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Embed0c {
        pub Level1a: i32,
        pub Level1b: i32,
        pub Level1c: i32,
        pub Level1d: i32,
        pub Level1e: i32 = "x",
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct ImagePoint {
        pub X: i32,
        pub Y: i32,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Point {
        pub Z: i32,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Embed0p {
        pub Point: ImagePoint as embed,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Embed0q {
        pub Point: Point as embed,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    struct Hidden {
        pub Q: i32,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Loop {
        pub Loop1: i32 = ",omitempty",
        pub Loop2: i32 = ",omitempty",
        pub Loop: Option<Box<Loop>> as embed_ptr(Loop),
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    struct Top {
        pub Level0: i32,
        pub Embed0: Embed0 as embed,
        pub Embed0a: Option<Embed0a> as embed_ptr(Embed0a),
        pub Embed0b: Option<Embed0b> as embed_ptr(Embed0b) = "e,omitempty",
        pub Embed0c: Embed0c as embed = "-",
        pub Loop: Loop as embed,
        pub Embed0p: Embed0p as embed,
        pub Embed0q: Embed0q as embed,
        embed: Hidden as embed,
    }
}

#[test]
fn promotion_annihilation_and_precedence() {
    let src = br#"{"Level0":1,"Level1b":2,"Level1c":3,"x":4,"Level1a":5,"LEVEL1B":6,"e":{"Level1a":8,"Level1b":9,"Level1c":10,"Level1d":11,"x":12},"Loop1":13,"Loop2":14,"X":15,"Y":16,"Z":17,"Q":18}"#;
    let mut top = Top::default();
    unmarshal(&src[..], &mut top).unwrap();
    assert_eq!(
        top,
        Top {
            Level0: 1,
            Embed0: Embed0 {
                Level1b: 2,
                Level1c: 3,
                ..Embed0::default()
            },
            Embed0a: Some(Embed0a {
                Level1a: 5,
                Level1b: 6,
                ..Embed0a::default()
            }),
            Embed0b: Some(Embed0b {
                Level1a: 8,
                Level1b: 9,
                Level1c: 10,
                Level1d: 11,
                Level1e: 12,
            }),
            Embed0c: Embed0c::default(),
            Loop: Loop {
                Loop1: 13,
                Loop2: 14,
                Loop: None,
            },
            Embed0p: Embed0p {
                Point: ImagePoint { X: 15, Y: 16 },
            },
            Embed0q: Embed0q {
                Point: Point { Z: 17 },
            },
            embed: Hidden { Q: 18 },
        }
    );
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S6 {
        pub X: i32,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S7 {
        pub X: i32,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S9 {
        pub X: i32,
        pub Y: i32,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S8 {
        pub S9: S9 as embed,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S5 {
        pub S6: S6 as embed,
        pub S7: S7 as embed,
        pub S8: S8 as embed,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S11 {
        pub S6: S6 as embed,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S12 {
        pub S6: S6 as embed,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S13 {
        pub S8: S8 as embed,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    pub struct S10 {
        pub S11: S11 as embed,
        pub S12: S12 as embed,
        pub S13: S13 as embed,
    }
}

#[test]
fn same_depth_conflict_hides_deeper_field() {
    let mut s5 = S5::default();
    unmarshal(&br#"{"X": 1,"Y":2}"#[..], &mut s5).unwrap();
    assert_eq!(
        s5,
        S5 {
            S8: S8 {
                S9: S9 { X: 0, Y: 2 },
            },
            ..S5::default()
        }
    );
}

#[test]
fn repeated_embedded_type_annihilates_its_fields() {
    let mut s10 = S10::default();
    unmarshal(&br#"{"X": 1,"Y":2}"#[..], &mut s10).unwrap();
    assert_eq!(
        s10,
        S10 {
            S13: S13 {
                S8: S8 {
                    S9: S9 { X: 0, Y: 2 },
                },
            },
            ..S10::default()
        }
    );
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    struct Private {
        pub Q: i32,
    }
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    struct Blocked {
        inner: Option<Private> as embed_ptr(Private),
        pub R: i32,
    }
}

#[test]
fn unexported_embedded_pointer_cannot_be_allocated() {
    let mut blocked = Blocked::default();
    let err = unmarshal(&br#"{"R":2,"Q":1}"#[..], &mut blocked).unwrap_err();
    assert!(matches!(err, Error::EmbeddedPointer("Private")));
    assert_eq!(
        err.to_string(),
        "json: cannot set embedded pointer to unexported struct: Private"
    );
    assert_eq!(blocked.R, 2);
    assert_eq!(blocked.inner, None);

    // Once present, the promoted field is reachable.
    let mut blocked = Blocked {
        inner: Some(Private::default()),
        R: 0,
    };
    unmarshal(&br#"{"R":2,"Q":1}"#[..], &mut blocked).unwrap();
    assert_eq!(blocked.inner, Some(Private { Q: 1 }));
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    struct Tree {
        pub Name: String,
        pub Kids: Vec<Tree>,
        pub Next: Option<Box<Tree>>,
    }
}

#[test]
fn self_referential_destinations() {
    let src = br#"{"name": "root", "kids": [{"name": "a"}, {"name": "b", "kids": [{"name": "c"}]}], "next": {"name": "sibling", "next": null}}"#;
    let mut tree = Tree::default();
    unmarshal(&src[..], &mut tree).unwrap();
    assert_eq!(tree.Name, "root");
    assert_eq!(tree.Kids.len(), 2);
    assert_eq!(tree.Kids[1].Kids[0].Name, "c");
    assert_eq!(tree.Next.as_ref().map(|t| t.Name.as_str()), Some("sibling"));
}

decode_struct! {
    #[derive(Debug, Default, PartialEq)]
    struct Folded {
        pub Kelvin: i32 = "k",
        pub Sigma: i32 = "ſ",
        pub Exact: i32 = "AbC",
        pub Other: i32 = "abc",
    }
}

#[test]
fn exact_names_beat_case_folding() {
    let mut f = Folded::default();
    unmarshal("{\"\u{212a}\": 1, \"S\": 2, \"abc\": 3, \"ABC\": 4}".as_bytes(), &mut f).unwrap();
    // "ABC" has no exact match and goes to the first field that folds equal.
    assert_eq!(
        f,
        Folded {
            Kelvin: 1,
            Sigma: 2,
            Exact: 4,
            Other: 3,
        }
    );
}
