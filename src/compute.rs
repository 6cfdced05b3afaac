//! Callables that can be memoized.
//!
//! A callable of arity `n` is seen through its argument tuple `(A1, ..., An)`,
//! which is also the key of the cache. Every closure or function of arity
//! 1 to 16 is a [`Compute`] out of the box.

/// A computation from an argument tuple `Args` to an output `Out`.
///
/// `recur` is the invocation entry point of the memoizer that owns this
/// computation. Plain functions ignore it; [`Recursive`] hands it to its
/// body so that the body can call back into its own cache.
pub trait Compute<Args, Out> {
    fn compute(&self, recur: &dyn Fn(Args) -> Out, args: Args) -> Out;
}

macro_rules! impl_compute {
    ($($ty:ident $arg:ident),+) => {
        impl<Func, Out, $($ty),+> Compute<($($ty,)+), Out> for Func
        where
            Func: Fn($($ty),+) -> Out,
        {
            fn compute(&self, _recur: &dyn Fn(($($ty,)+)) -> Out, ($($arg,)+): ($($ty,)+)) -> Out {
                (self)($($arg),+)
            }
        }
    };
}

impl_compute!(A1 a1);
impl_compute!(A1 a1, A2 a2);
impl_compute!(A1 a1, A2 a2, A3 a3);
impl_compute!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_compute!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_compute!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_compute!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_compute!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9
);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9, A10 a10
);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9, A10 a10, A11 a11
);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9, A10 a10, A11 a11, A12 a12
);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9, A10 a10, A11 a11, A12 a12, A13 a13
);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9, A10 a10, A11 a11, A12 a12, A13 a13, A14 a14
);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9, A10 a10, A11 a11, A12 a12, A13 a13, A14 a14, A15 a15
);
impl_compute!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8,
    A9 a9, A10 a10, A11 a11, A12 a12, A13 a13, A14 a14, A15 a15, A16 a16
);

/// A body that calls back into its own memoizer.
///
/// The body receives the memoizer's invocation entry point as its first
/// argument:
///
/// ```
/// use memofn::Recursive;
///
/// let fib = Recursive::new(|fib: &dyn Fn((u64,)) -> u64, (n,): (u64,)| {
///     fib((n - 1,)) + fib((n - 2,))
/// });
/// # let _ = fib;
/// ```
///
/// Base cases are either handled in the body or seeded into the cache.
/// Pair it with [`crate::Memoizer::with_store`] to recurse over a seeded or
/// ordered store.
pub struct Recursive<G>(G);

impl<G> Recursive<G> {
    pub fn new<Args, Out>(body: G) -> Self
    where
        G: Fn(&dyn Fn(Args) -> Out, Args) -> Out,
    {
        Recursive(body)
    }
}

impl<G, Args, Out> Compute<Args, Out> for Recursive<G>
where
    G: Fn(&dyn Fn(Args) -> Out, Args) -> Out,
{
    fn compute(&self, recur: &dyn Fn(Args) -> Out, args: Args) -> Out {
        (self.0)(recur, args)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run<Args, Out>(f: &impl Compute<Args, Out>, args: Args) -> Out {
        f.compute(&|_| panic!("plain callables never recurse"), args)
    }

    #[test]
    fn spreads_tuples() {
        assert_eq!(run(&|x: u32| x + 1, (1,)), 2);
        assert_eq!(run(&|a: &str, b: usize| a.len() * b, ("abc", 2)), 6);
        assert_eq!(
            run(&|a: u8, b: u8, c: u8, d: u8, e: u8| vec![a, b, c, d, e], (5, 4, 3, 2, 1)),
            vec![5, 4, 3, 2, 1]
        );
    }

    #[test]
    fn plain_fn_items() {
        fn concat(a: String, b: String) -> String {
            a + &b
        }
        assert_eq!(run(&concat, ("ab".to_string(), "cd".to_string())), "abcd");
    }

    #[test]
    fn recursive_body_receives_handle() {
        let body = Recursive::new(|recur: &dyn Fn((u32,)) -> u32, (n,): (u32,)| {
            if n == 0 {
                0
            } else {
                n + recur((n - 1,))
            }
        });
        // without a cache behind it the handle is just the body itself
        fn fix<G>(body: &Recursive<G>, args: (u32,)) -> u32
        where
            G: Fn(&dyn Fn((u32,)) -> u32, (u32,)) -> u32,
        {
            body.compute(&|args| fix(body, args), args)
        }
        assert_eq!(fix(&body, (4,)), 10);
    }
}
