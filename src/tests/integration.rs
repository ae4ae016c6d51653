//! Integration tests driving whole scheduling scenarios through the kernel.
//!
//! The mock port never switches stacks: `switch` stands in for the
//! context-switch interrupt and `on_next_switch` for whatever another
//! thread does while the caller is blocked.

#[cfg(test)]
mod scheduling_tests {
    use crate::arch::KernelHooks;
    use crate::tests::helpers::{launched, switch, tick};
    use crate::thread::ThreadState;

    #[test]
    fn test_equal_priorities_share_and_lower_starves() {
        let (kernel, ids) = launched(&[5, 5, 10]);
        assert_eq!(kernel.current_thread_id(), Some(ids[0]));

        for _ in 0..4 {
            assert_eq!(switch(kernel), Some(ids[1]));
            assert_eq!(switch(kernel), Some(ids[0]));
        }
    }

    #[test]
    fn test_urgent_thread_keeps_the_cpu() {
        let (kernel, ids) = launched(&[7, 2, 7]);
        for _ in 0..5 {
            assert_eq!(tick(kernel), Some(ids[1]));
        }
    }

    #[test]
    fn test_every_tick_requests_a_switch() {
        let (kernel, _) = launched(&[1]);
        let before = kernel.arch().switch_requests();
        for _ in 0..3 {
            kernel.tick();
        }
        assert_eq!(kernel.arch().switch_requests(), before + 3);
        assert_eq!(kernel.system_time(), 3);
    }

    #[test]
    fn test_sleeper_wakes_on_its_tick() {
        let (kernel, ids) = launched(&[1, 5]);
        let (a, b) = (ids[0], ids[1]);

        kernel.sleep(3);
        assert_eq!(kernel.thread_info(a).unwrap().state, ThreadState::Sleeping);
        assert_eq!(switch(kernel), Some(b));

        assert_eq!(tick(kernel), Some(b));
        assert_eq!(tick(kernel), Some(b));
        assert_eq!(tick(kernel), Some(a));
        assert_eq!(kernel.thread_info(a).unwrap().state, ThreadState::Running);
    }

    #[test]
    fn test_sleep_zero_only_yields() {
        let (kernel, ids) = launched(&[1, 1]);
        let before = kernel.arch().switch_requests();

        kernel.sleep(0);
        assert_eq!(kernel.arch().switch_requests(), before + 1);
        assert_eq!(kernel.thread_info(ids[0]).unwrap().state, ThreadState::Running);
        assert_eq!(switch(kernel), Some(ids[1]));
    }

    #[test]
    fn test_new_thread_runs_at_next_pass() {
        let (kernel, ids) = launched(&[5]);
        let urgent = kernel
            .add_thread(crate::tests::helpers::idle, 1, "urgent")
            .unwrap();
        assert_eq!(kernel.current_thread_id(), Some(ids[0]));
        assert_eq!(switch(kernel), Some(urgent));
    }

    #[test]
    fn test_returning_thread_exits() {
        let (kernel, ids) = launched(&[1, 2]);
        KernelHooks::exit_current(kernel);

        assert!(kernel.thread_info(ids[0]).is_none());
        assert_eq!(switch(kernel), Some(ids[1]));
        assert_eq!(kernel.thread_count(), 1);
    }

    #[test]
    fn test_nothing_eligible_resumes_outgoing() {
        let (kernel, ids) = launched(&[1]);
        kernel.sleep(10);
        assert_eq!(kernel.switch_context(0x2000_0100), 0x2000_0100);
        assert_eq!(kernel.current_thread_id(), Some(ids[0]));
    }
}

#[cfg(test)]
mod semaphore_tests {
    use crate::sync::Semaphore;
    use crate::tests::helpers::{launched, switch};
    use crate::thread::ThreadState;
    use std::boxed::Box;

    fn leaked(value: i32) -> &'static Semaphore {
        Box::leak(Box::new(Semaphore::new(value)))
    }

    #[test]
    fn test_wait_blocks_when_exhausted() {
        let (kernel, ids) = launched(&[1, 1]);
        let sem = leaked(0);
        kernel.init_semaphore(sem, 1);
        let before = kernel.arch().switch_requests();

        kernel.wait_semaphore(sem);
        assert_eq!(sem.value(), 0);
        assert_eq!(kernel.arch().switch_requests(), before);

        kernel.wait_semaphore(sem);
        assert_eq!(sem.value(), -1);
        assert_eq!(kernel.arch().switch_requests(), before + 1);
        assert_eq!(kernel.thread_info(ids[0]).unwrap().state, ThreadState::Blocked);

        // The blocked thread is skipped until released.
        assert_eq!(switch(kernel), Some(ids[1]));
        assert_eq!(switch(kernel), Some(ids[1]));

        kernel.signal_semaphore(sem);
        assert_eq!(sem.value(), 0);
        assert_eq!(kernel.thread_info(ids[0]).unwrap().state, ThreadState::Ready);
        assert_eq!(switch(kernel), Some(ids[0]));
    }

    #[test]
    fn test_signal_without_waiters_counts_up() {
        let (kernel, _) = launched(&[1]);
        let sem = leaked(0);
        kernel.signal_semaphore(sem);
        kernel.signal_semaphore(sem);
        assert_eq!(sem.value(), 2);
    }

    #[test]
    fn test_release_follows_scan_order() {
        let (kernel, ids) = launched(&[1, 1, 1]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        let sem = leaked(0);

        kernel.wait_semaphore(sem);
        assert_eq!(switch(kernel), Some(b));
        assert_eq!(switch(kernel), Some(c));
        kernel.wait_semaphore(sem);
        assert_eq!(sem.value(), -2);
        assert_eq!(switch(kernel), Some(b));

        // C sits just past B, so it goes first even though A waited longer.
        kernel.signal_semaphore(sem);
        assert_eq!(kernel.thread_info(c).unwrap().state, ThreadState::Ready);
        assert_eq!(kernel.thread_info(a).unwrap().state, ThreadState::Blocked);

        kernel.signal_semaphore(sem);
        assert_eq!(kernel.thread_info(a).unwrap().state, ThreadState::Ready);
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_killing_a_waiter_returns_its_unit() {
        let (kernel, ids) = launched(&[1, 1]);
        let sem = leaked(0);

        kernel.wait_semaphore(sem);
        assert_eq!(sem.value(), -1);
        assert_eq!(switch(kernel), Some(ids[1]));

        kernel.kill_thread(ids[0]).unwrap();
        assert_eq!(sem.value(), 0);
        assert_eq!(kernel.thread_count(), 1);
    }

    #[test]
    fn test_wait_before_launch_leaves_no_phantom_waiter() {
        let kernel = crate::tests::helpers::kernel();
        let sem = leaked(0);
        kernel.wait_semaphore(sem);
        assert_eq!(sem.value(), 0);
        assert_eq!(kernel.arch().switch_requests(), 0);

        kernel.init_semaphore(sem, 1);
        kernel.wait_semaphore(sem);
        assert_eq!(sem.value(), 0);
    }
}

#[cfg(test)]
mod fifo_tests {
    use crate::ipc::{Fifo, FifoStatus};
    use crate::tests::helpers::launched;
    use crate::thread::ThreadState;
    use portable_atomic::{AtomicBool, Ordering};
    use std::boxed::Box;

    fn leaked() -> &'static Fifo<4> {
        Box::leak(Box::new(Fifo::new()))
    }

    #[test]
    fn test_full_ring_drops_oldest() {
        let (kernel, _) = launched(&[1]);
        let fifo = leaked();
        fifo.init(kernel);

        for value in 1..=4 {
            assert_eq!(fifo.write(kernel, value), FifoStatus::Written);
        }
        assert_eq!(fifo.write(kernel, 5), FifoStatus::Overwritten);
        assert_eq!(fifo.lost(), 1);
        assert_eq!(fifo.len(), 4);

        for expected in 2..=5 {
            assert_eq!(fifo.read(kernel), expected);
        }
        assert!(fifo.is_empty(kernel));
    }

    #[test]
    fn test_blocked_reader_gets_next_write() {
        let (kernel, ids) = launched(&[1, 1]);
        let fifo = leaked();
        let before = kernel.arch().switch_requests();

        kernel.arch().on_next_switch(move || {
            assert_eq!(fifo.write(kernel, 42), FifoStatus::Written);
        });

        assert_eq!(fifo.read(kernel), 42);
        assert_eq!(kernel.arch().switch_requests(), before + 1);
        assert_eq!(kernel.thread_info(ids[0]).unwrap().state, ThreadState::Running);
        assert!(fifo.is_empty(kernel));
    }

    #[test]
    fn test_empty_while_reader_is_parked() {
        let (kernel, _) = launched(&[1, 1]);
        let fifo = leaked();
        let seen_empty: &'static AtomicBool = Box::leak(Box::new(AtomicBool::new(false)));

        kernel.arch().on_next_switch(move || {
            // The parked reader has driven the count below zero.
            seen_empty.store(fifo.is_empty(kernel), Ordering::SeqCst);
            fifo.write(kernel, 7);
        });

        assert_eq!(fifo.read(kernel), 7);
        assert!(seen_empty.load(Ordering::SeqCst));
        assert!(fifo.is_empty(kernel));
    }

    #[test]
    fn test_init_discards_content() {
        let (kernel, _) = launched(&[1]);
        let fifo = leaked();
        for value in 0..6 {
            fifo.write(kernel, value);
        }
        fifo.init(kernel);
        assert!(fifo.is_empty(kernel));
        assert_eq!(fifo.lost(), 0);

        fifo.write(kernel, 9);
        assert_eq!(fifo.read(kernel), 9);
    }

    #[test]
    fn test_kernel_channel_reports_overwrite() {
        let (kernel, _) = launched(&[1]);
        let capacity = crate::config::FIFO_CAPACITY as i32;
        for value in 0..capacity {
            assert_eq!(kernel.write_fifo(3, value), Ok(FifoStatus::Written));
        }
        assert_eq!(kernel.write_fifo(3, capacity), Ok(FifoStatus::Overwritten));
        assert_eq!(kernel.fifo_lost(3), Ok(1));
        assert_eq!(kernel.read_fifo(3), Ok(1));
    }
}

#[cfg(test)]
mod periodic_tests {
    use crate::arch::Arch;
    use crate::tests::helpers::{launched, tick};
    use portable_atomic::{AtomicUsize, Ordering};

    static EVERY_FOUR: AtomicUsize = AtomicUsize::new(0);
    static EVERY_THREE: AtomicUsize = AtomicUsize::new(0);

    fn every_four() {
        EVERY_FOUR.fetch_add(1, Ordering::SeqCst);
    }

    fn every_three() {
        EVERY_THREE.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_handlers_run_once_per_period() {
        let (kernel, _) = launched(&[1]);
        kernel.add_periodic_event(every_four, 4).unwrap();

        for _ in 0..10 {
            tick(kernel);
        }
        assert_eq!(EVERY_FOUR.load(Ordering::SeqCst), 2);

        // Registered at tick 10, first due at 13.
        kernel.add_periodic_event(every_three, 3).unwrap();
        for _ in 0..10 {
            tick(kernel);
        }
        assert_eq!(EVERY_THREE.load(Ordering::SeqCst), 3);
        assert_eq!(EVERY_FOUR.load(Ordering::SeqCst), 5);
        assert!(kernel.arch().interrupts_enabled());
    }
}
