use core::cell::Cell;
use std::rc::Rc;

use log::info;
use sharedptr_lib::{
    make_shared,
    mem::{local::Local, manager::Manager},
    Shared, Weak,
};

struct Resource(&'static str);

impl Drop for Resource {
    fn drop(&mut self) {
        info!("resource {} closed", self.0);
    }
}

fn main() {
    env_logger::init();

    let o1 = make_shared(42);
    let o2 = o1.clone();
    println!("copied: use_count {} {}", o1.use_count(), o2.use_count());
    drop(o1);
    println!("dropped the first owner: use_count {}, value {}", o2.use_count(), *o2);

    let w = Weak::from(&o2);
    drop(o2);
    println!("observer: expired {}, lock is null {}", w.expired(), w.lock().is_null());

    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let ptr = Box::into_raw(Box::new(Resource("adopted")));
    let adopted = unsafe {
        Shared::from_raw_with(ptr, move |p: *mut Resource| {
            drop(Box::from_raw(p));
            c.set(c.get() + 1);
        })
    };
    drop(adopted);
    println!("adopted: destroyer calls {}", calls.get());

    let local: &'static Local = Box::leak(Box::default());
    let o = local.fixed_new(Resource("combined"));
    let w1 = o.downgrade();
    let w2 = w1.clone();
    drop(o);
    println!("payload released: live blocks {}", local.blocks());
    drop(w1);
    println!("one observer left: live blocks {}", local.blocks());
    drop(w2);
    println!("storage released: live blocks {}", local.blocks());
}
