use rand::prelude::random;

use std::{sync::Arc, thread};

use super::*;

#[test]
fn test_spinlock() {
    let spin = Arc::new(Spinlock::new(Data::new(1024), true, random()));
    let c = Context {
        n_readers: 4,
        n_writers: 4,
        n_ops: 20_000,
    };

    let writer = |spin: Arc<Spinlock<Data>>, idx: usize, c: Context| {
        let value: Vec<u8> = (0..1024).map(|x| (x + idx) as u8).collect();
        for _ in 0..c.n_ops {
            let mut data = spin.write();
            data.idx = idx;
            data.value.copy_from_slice(&value);
        }
        idx
    };

    let reader = |spin: Arc<Spinlock<Data>>, c: Context| {
        let mut n = 0;
        for _ in 0..c.n_ops {
            let data = spin.read();
            let value: Vec<u8> = (0..1024).map(|x| (x + data.idx) as u8).collect();
            assert_eq!(value, data.value);
            n += 1;
        }
        n
    };

    let mut writers = vec![];
    for idx in 0..c.n_writers {
        let (arg1, arg2) = (Arc::clone(&spin), c.clone());
        writers.push(thread::spawn(move || writer(arg1, idx, arg2)));
    }
    let mut readers = vec![];
    for _idx in 0..c.n_readers {
        let (arg1, arg2) = (Arc::clone(&spin), c.clone());
        readers.push(thread::spawn(move || reader(arg1, arg2)));
    }

    for w in writers.into_iter() {
        w.join().unwrap();
    }
    for r in readers.into_iter() {
        assert_eq!(r.join().unwrap(), c.n_ops);
    }

    let stats = spin.to_stats().unwrap();
    assert_eq!(stats.latchlock, 0);
    println!("test_spinlock Spinlock {}", stats);
}

#[test]
fn test_spinlock_unsafe() {
    let mut spin = Spinlock::new(10_u64, false, true);
    assert!(!spin.is_safe());
    {
        let r1 = spin.read();
        let r2 = spin.read();
        assert_eq!(*r1 + *r2, 20);
    }
    {
        let mut w = spin.write();
        *w += 1;
    }
    assert_eq!(*spin.read(), 11);
    *spin.get_mut() += 1;
    assert_eq!(spin.into_inner(), 12);
}

#[test]
#[should_panic(expected = "concurrent access on unsafe container")]
fn test_spinlock_unsafe_overlap() {
    let spin = Spinlock::new(10_u64, false, true);
    let _r = spin.read();
    let _w = spin.write();
}

#[test]
#[should_panic(expected = "concurrent access on unsafe container")]
fn test_spinlock_unsafe_read_in_write() {
    let spin = Spinlock::new(10_u64, false, false);
    let _w = spin.write();
    let _r = spin.read();
}

struct Data {
    idx: usize,
    value: Vec<u8>,
}

impl Data {
    fn new(size: usize) -> Data {
        let value: Vec<u8> = (0..size).map(|x| x as u8).collect();
        Data { idx: 0, value }
    }
}

#[derive(Clone)]
struct Context {
    n_readers: usize,
    n_writers: usize,
    n_ops: usize,
}
